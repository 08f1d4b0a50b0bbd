//! Backend factory for dependency injection.
//!
//! This module creates analytics service clients from runtime configuration.

use std::sync::Arc;
use std::time::Duration;

use super::client::{AnalyticsBackend, BackendError, BackendResult};
#[cfg(feature = "http-backend")]
use super::clients::HttpBackend;
use super::clients::LocalBackend;
use super::config::ForecastConfig;

/// Backend type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Remote analytics service over HTTP (production)
    Http,
    /// In-memory service with fixture data
    Local,
}

impl BackendType {
    /// Parse backend type from string ("http", "local").
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "http" | "remote" => Ok(Self::Http),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown backend type: {}", s)),
        }
    }

    /// Get backend type from the `FORECAST_BACKEND` environment variable.
    /// Defaults to HTTP if not set or not recognised.
    pub fn from_env() -> Self {
        std::env::var("FORECAST_BACKEND")
            .ok()
            .and_then(|s| Self::parse(&s).ok())
            .unwrap_or(Self::Http)
    }
}

/// Factory for creating analytics service clients.
///
/// # Example
/// ```no_run
/// use forecast_core::backend::{BackendFactory, ForecastConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ForecastConfig::from_env()?;
/// let backend = BackendFactory::create(&config)?;
/// # Ok(())
/// # }
/// ```
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend from configuration.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn AnalyticsBackend>)` - Shared backend instance
    /// * `Err(BackendError)` - If the configuration is invalid
    pub fn create(config: &ForecastConfig) -> BackendResult<Arc<dyn AnalyticsBackend>> {
        config.validate()?;
        match config.backend_type()? {
            BackendType::Http => {
                let http = Self::create_http(&config.backend.base_url, config.request_timeout())?;
                Ok(http as Arc<dyn AnalyticsBackend>)
            }
            BackendType::Local => Ok(Self::create_local() as Arc<dyn AnalyticsBackend>),
        }
    }

    /// Create an HTTP client for the analytics service.
    #[cfg(feature = "http-backend")]
    pub fn create_http(base_url: &str, timeout: Duration) -> BackendResult<Arc<HttpBackend>> {
        Ok(Arc::new(HttpBackend::new(base_url, timeout)?))
    }

    #[cfg(not(feature = "http-backend"))]
    pub fn create_http(
        _base_url: &str,
        _timeout: Duration,
    ) -> BackendResult<Arc<LocalBackend>> {
        Err(BackendError::Configuration(
            "HTTP backend requires the 'http-backend' feature".to_string(),
        ))
    }

    /// Create an in-memory backend preloaded with the demo dataset.
    pub fn create_local() -> Arc<LocalBackend> {
        Arc::new(LocalBackend::with_demo_data())
    }

    /// Create a backend from environment configuration.
    pub fn from_env() -> BackendResult<Arc<dyn AnalyticsBackend>> {
        let config = ForecastConfig::from_env()?;
        Self::create(&config)
    }
}

/// Builder for configuring backend creation.
///
/// # Example
/// ```no_run
/// use forecast_core::backend::{BackendBuilder, BackendType};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = BackendBuilder::new()
///     .backend_type(BackendType::Http)
///     .base_url("http://localhost:5000/api")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct BackendBuilder {
    config: ForecastConfig,
}

impl BackendBuilder {
    /// Create a builder with default settings (HTTP, localhost, 30 s timeout).
    pub fn new() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }

    pub fn backend_type(mut self, backend_type: BackendType) -> Self {
        self.config.backend.backend_type = match backend_type {
            BackendType::Http => "http",
            BackendType::Local => "local",
        }
        .to_string();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.backend.base_url = base_url.into();
        self
    }

    /// Set the request timeout. Sub-second remainders round up to the next
    /// whole second, so only a zero duration is rejected by `build`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let round_up = u64::from(timeout.subsec_nanos() > 0);
        self.config.backend.request_timeout_secs = timeout.as_secs().saturating_add(round_up);
        self
    }

    /// Replace all settings with a loaded configuration.
    pub fn config(mut self, config: ForecastConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply environment overrides to the current settings.
    pub fn from_env(mut self) -> Result<Self, BackendError> {
        self.config.apply_env_overrides()?;
        Ok(self)
    }

    pub fn build(self) -> BackendResult<Arc<dyn AnalyticsBackend>> {
        BackendFactory::create(&self.config)
    }
}

impl Default for BackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
