//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resolver error: {0}")]
    Resolver(#[from] subburn_resolver::ResolutionError),

    #[error("Media error: {0}")]
    Media(#[from] subburn_media::MediaError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subburn_media::MediaError;
    use subburn_resolver::ResolutionError;

    #[test]
    fn test_startup_errors_convert() {
        let err: WorkerError = MediaError::download_failed("client build").into();
        assert!(matches!(err, WorkerError::Media(_)));

        let err: WorkerError = ResolutionError::unreachable("connection refused").into();
        assert!(matches!(err, WorkerError::Resolver(_)));

        let err = WorkerError::config_error("bad port");
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
