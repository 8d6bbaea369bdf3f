//! Link resolution error types.

use thiserror::Error;

/// Result type for link resolution.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Errors that can occur while resolving a link.
///
/// Each variant belongs to one provider family, so the user-facing message
/// can name what went wrong without further context.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// Generic link: HEAD request failed or returned a non-success status.
    #[error("Link unreachable: {0}")]
    Unreachable(String),

    /// Pixeldrain: info endpoint failed or returned no filename.
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// Google Drive: interstitial/quota page or no filename.
    #[error("Quota exceeded or invalid file: {0}")]
    QuotaOrInvalid(String),
}

impl ResolutionError {
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    pub fn provider_unreachable(msg: impl Into<String>) -> Self {
        Self::ProviderUnreachable(msg.into())
    }

    pub fn quota_or_invalid(msg: impl Into<String>) -> Self {
        Self::QuotaOrInvalid(msg.into())
    }

    /// Message shown to the user who submitted the link.
    pub fn user_message(&self) -> &'static str {
        match self {
            ResolutionError::Unreachable(_) => {
                "❌ The link appears to be broken or invalid. Please check it."
            }
            ResolutionError::ProviderUnreachable(_) => "❌ Could not resolve the Pixeldrain link.",
            ResolutionError::QuotaOrInvalid(_) => {
                "❌ Could not get a direct link from Google Drive. The file may have hit its download quota."
            }
        }
    }
}
