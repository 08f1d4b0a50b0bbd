//! Forecast Core - orchestration and result aggregation for a sales
//! forecasting dashboard.
//!
//! The statistical models run in a remote analytics service. This crate
//! sequences the calls to that service, keeps the latest training run in
//! memory and derives the views a dashboard renders from it: best model,
//! average accuracy, threshold filtering, scenario projections and merged
//! historical/forecast timelines.

pub mod api;
pub mod backend;
pub mod error;
pub mod services;

pub use error::{AnalysisError, AnalysisResult};
pub use services::AnalysisOrchestrator;
