//! Trait definitions for the remote analytics service.
//!
//! The service contract is split into focused traits so that implementations
//! and test doubles stay small:
//!
//! - [`error`]: Error types for service calls
//! - [`data`]: Dataset loading and CSV upload
//! - [`training`]: Multi-model training, single-model training, forecasting
//! - [`insights`]: Narrative insights, analytics panels, export
//!
//! # Convenience Trait Bound
//!
//! Code that needs the whole service uses [`AnalyticsBackend`]:
//!
//! ```ignore
//! async fn refresh<B: AnalyticsBackend + ?Sized>(backend: &B) -> BackendResult<()> {
//!     let dataset = backend.load_data().await?;
//!     let panel = backend.seasonality_analysis().await?;
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod error;
pub mod insights;
pub mod training;

pub use data::DataSource;
pub use error::{BackendError, BackendResult};
pub use insights::InsightSource;
pub use training::ModelTrainer;

/// Composite trait bound for a complete analytics service client.
///
/// Automatically implemented for any type implementing all three traits.
pub trait AnalyticsBackend: DataSource + ModelTrainer + InsightSource {}

impl<T> AnalyticsBackend for T where T: DataSource + ModelTrainer + InsightSource {}
