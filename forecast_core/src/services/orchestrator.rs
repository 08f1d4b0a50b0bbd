//! Analysis orchestrator.
//!
//! Owns the session state (historical series, dataset profile, latest
//! training run) and sequences the remote calls that change it. Derived
//! views are computed from snapshots of that state with the pure functions
//! in the sibling modules.
//!
//! Every operation checks its arguments and preconditions before touching
//! the network, and every failure leaves the previous state in place.

use log::{debug, info, warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::api::*;
use crate::backend::client::{AnalyticsBackend, BackendError, BackendResult};
use crate::backend::config::ForecastConfig;
use crate::backend::factory::BackendFactory;
use crate::backend::wire::{ForecastRequest, InsightsRequest, SingleModelRequest, TrainingRequest};
use crate::error::{AnalysisError, AnalysisResult};

use super::metrics::summarize;
use super::scenarios::{project_scenarios_with, ScenarioBand};
use super::series::{compose_comparison, merge_historical_and_forecast};
use super::thresholds::apply_thresholds;

/// Runtime knobs of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Upper bound on every remote call.
    pub request_timeout: Duration,
    pub scenario_band: ScenarioBand,
}

impl OrchestratorSettings {
    pub fn from_config(config: &ForecastConfig) -> AnalysisResult<Self> {
        Ok(Self {
            request_timeout: config.request_timeout(),
            scenario_band: config.scenario_band()?,
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            scenario_band: ScenarioBand::default(),
        }
    }
}

#[derive(Default)]
struct SessionState {
    historical: Option<Arc<HistoricalSeries>>,
    profile: Option<Arc<DatasetProfile>>,
    result_set: Option<Arc<ResultSet>>,
}

/// Outcome of [`AnalysisOrchestrator::load_analytics_panels`].
///
/// Each panel succeeds or fails on its own.
#[derive(Debug, Clone)]
pub struct AnalyticsPanels {
    pub seasonality: AnalysisResult<SeasonalityAnalysis>,
    pub feature_importance: AnalysisResult<FeatureImportance>,
    pub advanced: AnalysisResult<AdvancedAnalytics>,
}

impl AnalyticsPanels {
    /// Number of panels that loaded.
    pub fn loaded(&self) -> usize {
        [
            self.seasonality.is_ok(),
            self.feature_importance.is_ok(),
            self.advanced.is_ok(),
        ]
        .iter()
        .filter(|ok| **ok)
        .count()
    }
}

/// Top-level controller of a forecasting session.
///
/// State is kept behind a single lock that is never held across a remote
/// call. Training runs are queued behind their own gate, so the cached
/// [`ResultSet`] always comes from the latest run that was started and
/// succeeded.
///
/// # Example
/// ```no_run
/// use forecast_core::backend::BackendFactory;
/// use forecast_core::services::AnalysisOrchestrator;
///
/// # async fn run() -> Result<(), forecast_core::AnalysisError> {
/// let orchestrator = AnalysisOrchestrator::new(BackendFactory::create_local());
/// orchestrator.load_historical_data().await?;
/// let models = vec!["Naive".to_string(), "XGBoost".to_string()];
/// let result_set = orchestrator.run_training(&models, 3).await?;
/// let forecast = orchestrator.generate_forecast("best", 6).await?;
/// let view = orchestrator.compose_forecast_view(forecast)?;
/// println!("{} best, base case {:.0}", result_set.best_model, view.scenarios.base);
/// # Ok(())
/// # }
/// ```
pub struct AnalysisOrchestrator {
    backend: Arc<dyn AnalyticsBackend>,
    settings: OrchestratorSettings,
    state: RwLock<SessionState>,
    training_gate: Mutex<()>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator with default settings (30 s timeout, ±15% band).
    pub fn new(backend: Arc<dyn AnalyticsBackend>) -> Self {
        Self::with_settings(backend, OrchestratorSettings::default())
    }

    pub fn with_settings(backend: Arc<dyn AnalyticsBackend>, settings: OrchestratorSettings) -> Self {
        Self {
            backend,
            settings,
            state: RwLock::new(SessionState::default()),
            training_gate: Mutex::new(()),
        }
    }

    /// Build the backend and settings from a loaded configuration.
    pub fn from_config(config: &ForecastConfig) -> AnalysisResult<Self> {
        let backend = BackendFactory::create(config)?;
        let settings = OrchestratorSettings::from_config(config)?;
        Ok(Self::with_settings(backend, settings))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Whether the analytics service is reachable.
    pub async fn health_check(&self) -> bool {
        match self.remote(self.backend.health_check()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Bound a remote call by the configured timeout.
    async fn remote<T, F>(&self, call: F) -> BackendResult<T>
    where
        F: Future<Output = BackendResult<T>>,
    {
        let limit = self.settings.request_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Transport(format!(
                "request timed out after {}s",
                limit.as_secs_f64()
            ))),
        }
    }

    fn require_historical(&self) -> AnalysisResult<Arc<HistoricalSeries>> {
        self.historical().ok_or_else(|| {
            AnalysisError::Precondition("Historical data not loaded. Load data first.".to_string())
        })
    }

    fn require_result_set(&self, action: &str) -> AnalysisResult<Arc<ResultSet>> {
        self.result_set().ok_or_else(|| {
            AnalysisError::Precondition(format!("Please train models before {}", action))
        })
    }

    // ==================== Operations ====================

    /// Fetch the historical series and its profile, replacing any previous one.
    ///
    /// # Returns
    /// * `Ok(Arc<HistoricalSeries>)` - The newly stored series
    /// * `Err(AnalysisError::DataUnavailable)` - If the service failed or was
    ///   unreachable; the previous series stays in place
    pub async fn load_historical_data(&self) -> AnalysisResult<Arc<HistoricalSeries>> {
        debug!("Requesting historical data");
        let dataset = self
            .remote(self.backend.load_data())
            .await
            .map_err(|e| AnalysisError::DataUnavailable(e.to_string()))?;

        let LoadedDataset { series, profile } = dataset;
        if series.dates.len() != series.values.len() {
            return Err(AnalysisError::DataUnavailable(format!(
                "historical series has {} dates but {} values",
                series.dates.len(),
                series.values.len()
            )));
        }

        let series = Arc::new(series);
        {
            let mut state = self.state.write();
            state.historical = Some(Arc::clone(&series));
            state.profile = Some(Arc::new(profile));
        }
        info!(
            "Loaded {} months of historical data (last period {})",
            series.len(),
            series.last_date().unwrap_or("n/a")
        );
        Ok(series)
    }

    /// Upload a CSV file, then reload the historical series from the service.
    ///
    /// The cached training run is kept.
    pub async fn upload_csv(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> AnalysisResult<Arc<HistoricalSeries>> {
        if bytes.is_empty() {
            return Err(AnalysisError::InvalidRequest("uploaded file is empty".to_string()));
        }
        if !file_name.trim().to_lowercase().ends_with(".csv") {
            return Err(AnalysisError::InvalidRequest(format!(
                "'{}' is not a CSV file",
                file_name
            )));
        }

        debug!("Uploading {} ({} bytes)", file_name, bytes.len());
        self.remote(self.backend.upload_csv(file_name, bytes)).await?;
        info!("Uploaded {}", file_name);

        self.load_historical_data().await
    }

    /// Train the selected models and replace the cached training run.
    ///
    /// # Arguments
    /// * `models` - Non-empty selection of model identifiers, in display order
    /// * `test_size` - Number of trailing periods held out for evaluation
    ///
    /// # Returns
    /// * `Ok(Arc<ResultSet>)` - The new training run
    /// * `Err(AnalysisError::TrainingFailed)` - If the service rejected the run
    ///   or answered with an inconsistent result; the previous run is kept
    pub async fn run_training(
        &self,
        models: &[String],
        test_size: u32,
    ) -> AnalysisResult<Arc<ResultSet>> {
        if models.is_empty() {
            return Err(AnalysisError::InvalidRequest(
                "select at least one model to train".to_string(),
            ));
        }
        if models.iter().any(|m| m.trim().is_empty()) {
            return Err(AnalysisError::InvalidRequest(
                "model identifiers must not be blank".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(models.len());
        if let Some(repeated) = models.iter().find(|m| !seen.insert(m.trim())) {
            return Err(AnalysisError::InvalidRequest(format!(
                "model '{}' is selected more than once",
                repeated.trim()
            )));
        }
        validate_test_size(test_size)?;
        self.require_historical()?;

        let _gate = self.training_gate.lock().await;

        let request = TrainingRequest {
            models: models.to_vec(),
            test_size,
        };
        debug!("Training {} model(s) with test size {}", models.len(), test_size);

        let result_set = self
            .remote(self.backend.train_models(&request))
            .await
            .map_err(training_error)?;
        result_set.validate().map_err(AnalysisError::TrainingFailed)?;

        let result_set = Arc::new(result_set);
        self.state.write().result_set = Some(Arc::clone(&result_set));
        info!(
            "Training run replaced: {} model(s), best model {}",
            result_set.metrics.len(),
            result_set.best_model
        );
        Ok(result_set)
    }

    /// Train one model with custom parameters.
    ///
    /// Independent of the cached training run: it neither needs nor changes it.
    pub async fn train_single_model(
        &self,
        model: &str,
        test_size: u32,
        parameters: Map<String, Value>,
    ) -> AnalysisResult<SingleModelRun> {
        if model.trim().is_empty() {
            return Err(AnalysisError::InvalidRequest("model identifier is blank".to_string()));
        }
        validate_test_size(test_size)?;
        self.require_historical()?;

        let request = SingleModelRequest {
            model: model.to_string(),
            test_size,
            parameters,
        };
        debug!("Training single model {}", model);

        let run = self
            .remote(self.backend.train_single_model(&request))
            .await
            .map_err(training_error)?;
        info!("Single model {} trained: MAPE {:.2}%", run.model, run.metric.mape);
        Ok(run)
    }

    /// Forecast `horizon_months` periods past the historical series.
    ///
    /// `"best"` (or an empty name) stands for the best model of the cached run.
    pub async fn generate_forecast(
        &self,
        model_name: &str,
        horizon_months: u32,
    ) -> AnalysisResult<ForecastResult> {
        if horizon_months == 0 {
            return Err(AnalysisError::InvalidRequest(
                "forecast horizon must be at least one month".to_string(),
            ));
        }
        let result_set = self.require_result_set("generating a forecast")?;

        let name = model_name.trim();
        let model_name = if name.is_empty() || name.eq_ignore_ascii_case(BEST_MODEL_ALIAS) {
            result_set.best_model.clone()
        } else {
            name.to_string()
        };

        let request = ForecastRequest {
            months: horizon_months,
            model_name,
        };
        debug!("Forecasting {} month(s) with {}", request.months, request.model_name);

        let forecast = self.remote(self.backend.generate_forecast(&request)).await?;
        forecast.validate().map_err(AnalysisError::Backend)?;
        Ok(forecast)
    }

    /// Merge a forecast with the historical series and project its scenarios.
    pub fn compose_forecast_view(&self, forecast: ForecastResult) -> AnalysisResult<ForecastView> {
        forecast.validate().map_err(AnalysisError::InvalidRequest)?;
        let historical = self.require_historical()?;
        let series = merge_historical_and_forecast(&historical, &forecast);
        let scenarios = project_scenarios_with(&forecast.forecast_values, &self.settings.scenario_band)?;
        Ok(ForecastView {
            series,
            scenarios,
            forecast,
        })
    }

    /// Ask the service for a narrative summary of the cached run.
    pub async fn generate_insights(&self) -> AnalysisResult<String> {
        let result_set = self.require_result_set("generating insights")?;
        let request = InsightsRequest::from_result_set(&result_set);
        debug!("Requesting insights for {} model(s)", result_set.metrics.len());
        Ok(self.remote(self.backend.ai_insights(&request)).await?)
    }

    /// Fetch the three analytics panels concurrently.
    ///
    /// A failing panel is logged and reported in its slot; it never aborts
    /// the others.
    pub async fn load_analytics_panels(&self) -> AnalyticsPanels {
        let (seasonality, feature_importance, advanced) = tokio::join!(
            self.remote(self.backend.seasonality_analysis()),
            self.remote(self.backend.feature_importance()),
            self.remote(self.backend.advanced_analytics()),
        );

        let panels = AnalyticsPanels {
            seasonality: fail_soft("seasonality", seasonality),
            feature_importance: fail_soft("feature importance", feature_importance.and_then(
                |panel| {
                    if panel.features.len() == panel.importances.len() {
                        Ok(panel)
                    } else {
                        Err(BackendError::Decode(format!(
                            "{} features but {} importances",
                            panel.features.len(),
                            panel.importances.len()
                        )))
                    }
                },
            )),
            advanced: fail_soft("advanced analytics", advanced),
        };
        debug!("Loaded {}/3 analytics panels", panels.loaded());
        panels
    }

    /// Download the service's export of the cached run.
    pub async fn export_current_results(&self) -> AnalysisResult<ExportFile> {
        self.require_result_set("exporting results")?;
        let file = self.remote(self.backend.export_data()).await?;
        info!("Exported {} ({} bytes)", file.file_name, file.bytes.len());
        Ok(file)
    }

    // ==================== Views ====================

    pub fn historical(&self) -> Option<Arc<HistoricalSeries>> {
        self.state.read().historical.clone()
    }

    pub fn profile(&self) -> Option<Arc<DatasetProfile>> {
        self.state.read().profile.clone()
    }

    pub fn result_set(&self) -> Option<Arc<ResultSet>> {
        self.state.read().result_set.clone()
    }

    /// Overview figures of the cached run.
    pub fn summary(&self) -> AnalysisResult<ResultSummary> {
        let result_set = self.require_result_set("summarizing results")?;
        summarize(&result_set.metrics)
    }

    /// Actual against predicted values of the cached run.
    pub fn comparison(&self) -> AnalysisResult<ComparisonSeries> {
        let result_set = self.require_result_set("comparing models")?;
        Ok(compose_comparison(&result_set))
    }

    /// Partition the cached run's models against accuracy thresholds.
    pub fn threshold_outcome(&self, mape_max: f64, wape_max: f64) -> AnalysisResult<ThresholdOutcome> {
        let result_set = self.require_result_set("applying thresholds")?;
        Ok(apply_thresholds(&result_set.metrics, mape_max, wape_max))
    }

    /// Forget all session state.
    pub fn clear(&self) {
        *self.state.write() = SessionState::default();
        info!("Session state cleared");
    }
}

fn validate_test_size(test_size: u32) -> AnalysisResult<()> {
    if test_size == 0 {
        return Err(AnalysisError::InvalidRequest(
            "test size must be a positive number of periods".to_string(),
        ));
    }
    Ok(())
}

fn training_error(err: BackendError) -> AnalysisError {
    match err {
        BackendError::Rejected(msg) | BackendError::Decode(msg) => AnalysisError::TrainingFailed(msg),
        other => other.into(),
    }
}

fn fail_soft<T>(panel: &str, result: BackendResult<T>) -> AnalysisResult<T> {
    result.map_err(|e| {
        warn!("Analytics panel '{}' unavailable: {}", panel, e);
        AnalysisError::from(e)
    })
}
