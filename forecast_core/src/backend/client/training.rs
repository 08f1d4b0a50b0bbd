//! Model training and forecasting operations.

use async_trait::async_trait;

use super::error::BackendResult;
use crate::api::{ForecastResult, ResultSet, SingleModelRun};
use crate::backend::wire::{ForecastRequest, SingleModelRequest, TrainingRequest};

/// Training and forecasting calls of the analytics service.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    /// Train and evaluate several models on the same test window.
    ///
    /// # Returns
    /// * `Ok(ResultSet)` - Metrics, test values and predictions of every model
    /// * `Err(BackendError)` - If training fails or the service is unreachable
    async fn train_models(&self, request: &TrainingRequest) -> BackendResult<ResultSet>;

    /// Train a single model with optional model-specific parameters.
    async fn train_single_model(&self, request: &SingleModelRequest)
        -> BackendResult<SingleModelRun>;

    /// Project a trained model forward.
    async fn generate_forecast(&self, request: &ForecastRequest) -> BackendResult<ForecastResult>;
}
