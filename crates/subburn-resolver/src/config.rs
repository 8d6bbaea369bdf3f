//! Resolver configuration.

use std::time::Duration;

/// Link resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Pixeldrain API base (no trailing slash)
    pub pixeldrain_api_base: String,
    /// Google Drive base (no trailing slash)
    pub drive_base: String,
    /// Timeout for the Pixeldrain info call
    pub pixeldrain_timeout: Duration,
    /// Timeout for Google Drive requests
    pub drive_timeout: Duration,
    /// Timeout for the generic HEAD probe
    pub head_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pixeldrain_api_base: "https://pixeldrain.com/api".to_string(),
            drive_base: "https://drive.google.com".to_string(),
            pixeldrain_timeout: Duration::from_secs(10),
            drive_timeout: Duration::from_secs(15),
            head_timeout: Duration::from_secs(15),
        }
    }
}

impl ResolverConfig {
    /// Point provider endpoints at another host (mirrors, tests).
    pub fn with_bases(mut self, pixeldrain_api_base: impl Into<String>, drive_base: impl Into<String>) -> Self {
        self.pixeldrain_api_base = pixeldrain_api_base.into().trim_end_matches('/').to_string();
        self.drive_base = drive_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Use one timeout for the HEAD probe and Drive requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.drive_timeout = timeout;
        self.head_timeout = timeout;
        self
    }

    pub fn with_pixeldrain_timeout(mut self, timeout: Duration) -> Self {
        self.pixeldrain_timeout = timeout;
        self
    }
}
