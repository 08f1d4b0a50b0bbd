//! Access to the remote analytics service.
//!
//! The service is reached through three traits (data, training, insights)
//! bundled as [`AnalyticsBackend`]. Two implementations exist:
//!
//! - [`clients::HttpBackend`]: the REST client used in production
//! - [`clients::LocalBackend`]: an in-memory double for tests and demos
//!
//! Use [`BackendFactory`] or [`BackendBuilder`] to pick one from configuration.

pub mod client;
pub mod clients;
pub mod config;
pub mod factory;
pub mod wire;

pub use client::{AnalyticsBackend, BackendError, BackendResult, DataSource, InsightSource, ModelTrainer};
pub use config::ForecastConfig;
pub use factory::{BackendBuilder, BackendFactory, BackendType};
