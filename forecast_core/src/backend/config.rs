//! Configuration file support.
//!
//! This module reads the client configuration from a TOML file and applies
//! environment overrides on top of it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::client::BackendError;
use super::factory::BackendType;
use crate::api::DEFAULT_MODELS;
use crate::services::scenarios::ScenarioBand;

/// Client configuration from file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub scenarios: ScenarioSettings,
    #[serde(default)]
    pub training: TrainingSettings,
}

/// Analytics service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Scenario band settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSettings {
    #[serde(default = "default_ratio")]
    pub upside: f64,
    #[serde(default = "default_ratio")]
    pub downside: f64,
}

/// Defaults for training and forecasting requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_test_size")]
    pub test_size: u32,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_forecast_months")]
    pub forecast_months: u32,
}

fn default_backend_type() -> String {
    "http".to_string()
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_ratio() -> f64 {
    ScenarioBand::DEFAULT_RATIO
}

fn default_test_size() -> u32 {
    3
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn default_forecast_months() -> u32 {
    3
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            upside: default_ratio(),
            downside: default_ratio(),
        }
    }
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            models: default_models(),
            forecast_months: default_forecast_months(),
        }
    }
}

impl ForecastConfig {
    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, BackendError> {
        let config: ForecastConfig = toml::from_str(content).map_err(|e| {
            BackendError::Configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(ForecastConfig)` if successful
    /// * `Err(BackendError)` if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            BackendError::Configuration(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `forecast.toml` in:
    /// 1. Current directory
    /// 2. `forecast_core/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, BackendError> {
        let search_paths = [
            PathBuf::from("forecast.toml"),
            PathBuf::from("forecast_core/forecast.toml"),
            PathBuf::from("../forecast.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Err(BackendError::Configuration(
            "No forecast.toml found in standard locations".to_string(),
        ))
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Result<Self, BackendError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `FORECAST_BACKEND`, `FORECAST_API_BASE` and `FORECAST_TIMEOUT_SECS`.
    pub fn apply_env_overrides(&mut self) -> Result<(), BackendError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), BackendError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("FORECAST_BACKEND") {
            self.backend.backend_type = kind;
        }
        if let Some(url) = lookup("FORECAST_API_BASE") {
            self.backend.base_url = url;
        }
        if let Some(secs) = lookup("FORECAST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = secs.trim().parse().map_err(|e| {
                BackendError::Configuration(format!("Invalid FORECAST_TIMEOUT_SECS '{}': {}", secs, e))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        self.backend_type()?;

        if self.backend.request_timeout_secs == 0 {
            return Err(BackendError::Configuration(
                "backend.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.backend_type()? == BackendType::Http && self.backend.base_url.trim().is_empty() {
            return Err(BackendError::Configuration(
                "HTTP backend requires 'backend.base_url' setting".to_string(),
            ));
        }

        self.scenario_band()?;

        if self.training.test_size == 0 {
            return Err(BackendError::Configuration(
                "training.test_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the backend type from configuration.
    pub fn backend_type(&self) -> Result<BackendType, BackendError> {
        BackendType::parse(&self.backend.backend_type).map_err(BackendError::Configuration)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn scenario_band(&self) -> Result<ScenarioBand, BackendError> {
        ScenarioBand::new(self.scenarios.upside, self.scenarios.downside)
            .map_err(BackendError::Configuration)
    }
}
