//! Dataset operations: loading the historical series and replacing it.

use async_trait::async_trait;

use super::error::BackendResult;
use crate::api::LoadedDataset;

/// Access to the dataset held by the analytics service.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Check whether the service is reachable.
    async fn health_check(&self) -> BackendResult<bool>;

    /// Load (and preprocess) the current dataset.
    ///
    /// # Returns
    /// * `Ok(LoadedDataset)` - Historical series plus statistics and feature info
    /// * `Err(BackendError)` - If the service fails or cannot be reached
    async fn load_data(&self) -> BackendResult<LoadedDataset>;

    /// Replace the service's dataset with an uploaded CSV file.
    ///
    /// # Arguments
    /// * `file_name` - Original file name, sent with the multipart part
    /// * `bytes` - Raw CSV content
    async fn upload_csv(&self, file_name: &str, bytes: Vec<u8>) -> BackendResult<()>;
}
