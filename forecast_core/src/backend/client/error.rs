//! Error types for analytics service calls.

/// Result type for analytics service calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Error type for analytics service calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

impl<E: std::fmt::Display> From<serde_path_to_error::Error<E>> for BackendError {
    fn from(err: serde_path_to_error::Error<E>) -> Self {
        BackendError::Decode(format!("{} (at {})", err.inner(), err.path()))
    }
}
