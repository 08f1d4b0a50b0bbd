//! Error types surfaced by the orchestration core.

use crate::backend::client::BackendError;

/// Result type for orchestrator and aggregation operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error type for orchestrator and aggregation operations.
///
/// Every variant carries a message that can be shown to the user as is. No
/// variant is fatal: prior state is kept and further operations are allowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The analytics service could not be reached (or did not answer in time).
    #[error("Network error: {0}")]
    Transport(String),

    /// The analytics service answered but reported a failure.
    #[error("Backend error: {0}")]
    Backend(String),

    /// An operation was invoked before a required prior step.
    #[error("{0}")]
    Precondition(String),

    /// A caller-supplied argument violates a stated constraint.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An aggregation was given zero elements where one or more are required.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Historical data could not be loaded.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A training run failed; carries the service's message.
    #[error("Training failed: {0}")]
    TrainingFailed(String),
}

impl AnalysisError {
    /// True for failures of a remote call (as opposed to local validation).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AnalysisError::Transport(_)
                | AnalysisError::Backend(_)
                | AnalysisError::DataUnavailable(_)
                | AnalysisError::TrainingFailed(_)
        )
    }
}

impl From<BackendError> for AnalysisError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Transport(msg) => AnalysisError::Transport(msg),
            BackendError::Rejected(msg) => AnalysisError::Backend(msg),
            BackendError::Decode(msg) => {
                AnalysisError::Backend(format!("malformed response: {}", msg))
            }
            BackendError::Configuration(msg) => AnalysisError::InvalidRequest(msg),
        }
    }
}
