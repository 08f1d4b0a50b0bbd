//! In-memory analytics service.
//!
//! This module provides a local implementation of all backend traits suitable
//! for unit testing, demos and offline development. The dataset lives in
//! memory, "predictions" are deterministic fixtures derived from the series,
//! and every call is recorded so tests can assert which requests were sent.

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::api::*;
use crate::backend::client::*;
use crate::backend::wire::{ForecastRequest, InsightsRequest, SingleModelRequest, TrainingRequest};
use crate::services::metrics::{model_consensus, select_best_model};

/// Monthly sales used by [`LocalBackend::with_demo_data`], starting 2022-01.
const DEMO_SALES: [f64; 24] = [
    42_150.0, 40_830.0, 45_920.0, 47_310.0, 49_880.0, 52_460.0, 51_020.0, 53_770.0, 50_940.0,
    55_310.0, 61_480.0, 68_920.0, 47_880.0, 46_210.0, 51_650.0, 53_090.0, 55_940.0, 58_720.0,
    57_160.0, 60_030.0, 56_870.0, 61_940.0, 68_350.0, 76_410.0,
];

const DEMO_FEATURES: [(&str, f64); 5] = [
    ("Lag_1", 0.41),
    ("Rolling_Mean_3", 0.22),
    ("Month", 0.17),
    ("Quarter", 0.12),
    ("Lag_12", 0.08),
];

const ML_MODELS: [&str; 2] = ["Random_Forest", "XGBoost"];

/// Remote operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    HealthCheck,
    LoadData,
    UploadCsv,
    TrainModels,
    TrainSingleModel,
    GenerateForecast,
    AiInsights,
    SeasonalityAnalysis,
    FeatureImportance,
    AdvancedAnalytics,
    ExportData,
}

/// In-memory analytics service.
///
/// # Example
/// ```
/// use forecast_core::backend::clients::{LocalBackend, Operation};
///
/// let backend = LocalBackend::with_demo_data();
/// backend.set_healthy(false);
/// assert_eq!(backend.call_count(Operation::LoadData), 0);
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    dataset: Option<LoadedDataset>,
    staged_upload: Option<LoadedDataset>,
    training_override: Option<ResultSet>,

    // Service-side session, mirroring what the remote service remembers
    data_loaded: bool,
    last_run: Option<ResultSet>,

    failures: HashMap<Operation, BackendError>,
    calls: Vec<Operation>,
    uploads: Vec<(String, usize)>,
    latency: Option<Duration>,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            dataset: None,
            staged_upload: None,
            training_override: None,
            data_loaded: false,
            last_run: None,
            failures: HashMap::new(),
            calls: Vec::new(),
            uploads: Vec::new(),
            latency: None,
            is_healthy: true,
        }
    }
}

impl LocalBackend {
    /// Create a service without any dataset.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a service holding 24 months of demo sales.
    pub fn with_demo_data() -> Self {
        let dates = month_labels(NaiveDate::from_ymd_opt(2022, 1, 1), DEMO_SALES.len());
        let series = HistoricalSeries {
            dates,
            values: DEMO_SALES.to_vec(),
        };
        let backend = Self::new();
        backend.set_dataset(dataset_from_series(series));
        backend
    }

    /// Replace the dataset served by `load_data`.
    pub fn set_dataset(&self, dataset: LoadedDataset) {
        self.data.write().dataset = Some(dataset);
    }

    /// Dataset that the next successful `upload_csv` installs.
    pub fn stage_upload(&self, dataset: LoadedDataset) {
        self.data.write().staged_upload = Some(dataset);
    }

    /// Serve this result set (restricted to the requested models) from
    /// `train_models` instead of the generated fixtures.
    pub fn set_training_result(&self, result_set: ResultSet) {
        self.data.write().training_override = Some(result_set);
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.data.write().failures.insert(operation, error);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.data.write().latency = latency;
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Operations received so far, in arrival order.
    pub fn calls(&self) -> Vec<Operation> {
        self.data.read().calls.clone()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.data.read().calls.iter().filter(|op| **op == operation).count()
    }

    /// File names and sizes of accepted uploads.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.data.read().uploads.clone()
    }

    /// Record the call, wait out the configured latency, then surface any
    /// injected failure.
    async fn begin(&self, operation: Operation) -> BackendResult<()> {
        let latency = {
            let mut data = self.data.write();
            data.calls.push(operation);
            data.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.data.write().failures.remove(&operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn require_last_run(&self, message: &str) -> BackendResult<ResultSet> {
        self.data
            .read()
            .last_run
            .clone()
            .ok_or_else(|| BackendError::Rejected(message.to_string()))
    }

    fn require_series(&self) -> BackendResult<HistoricalSeries> {
        let data = self.data.read();
        match (&data.dataset, data.data_loaded) {
            (Some(dataset), true) => Ok(dataset.series.clone()),
            _ => Err(BackendError::Rejected(
                "Data not loaded. Please load data first.".to_string(),
            )),
        }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for LocalBackend {
    async fn health_check(&self) -> BackendResult<bool> {
        self.begin(Operation::HealthCheck).await?;
        Ok(self.data.read().is_healthy)
    }

    async fn load_data(&self) -> BackendResult<LoadedDataset> {
        self.begin(Operation::LoadData).await?;
        let mut data = self.data.write();
        let dataset = data
            .dataset
            .clone()
            .ok_or_else(|| BackendError::Rejected("No dataset available".to_string()))?;
        data.data_loaded = true;
        Ok(dataset)
    }

    async fn upload_csv(&self, file_name: &str, bytes: Vec<u8>) -> BackendResult<()> {
        self.begin(Operation::UploadCsv).await?;
        if bytes.is_empty() {
            return Err(BackendError::Rejected("No file selected".to_string()));
        }

        let mut data = self.data.write();
        data.uploads.push((file_name.to_string(), bytes.len()));
        if let Some(dataset) = data.staged_upload.take() {
            data.dataset = Some(dataset);
        }
        Ok(())
    }
}

#[async_trait]
impl ModelTrainer for LocalBackend {
    async fn train_models(&self, request: &TrainingRequest) -> BackendResult<ResultSet> {
        self.begin(Operation::TrainModels).await?;
        let series = self.require_series()?;

        let override_set = self.data.read().training_override.clone();
        let result_set = match override_set {
            Some(fixture) => restrict_to_models(&fixture, &request.models)?,
            None => fixture_training_run(&series, &request.models, request.test_size)?,
        };

        self.data.write().last_run = Some(result_set.clone());
        Ok(result_set)
    }

    async fn train_single_model(
        &self,
        request: &SingleModelRequest,
    ) -> BackendResult<SingleModelRun> {
        self.begin(Operation::TrainSingleModel).await?;
        let series = self.require_series()?;

        if model_factor(&request.model).is_none() {
            return Err(BackendError::Rejected(format!(
                "Invalid model name: \"{}\". Valid names: {}",
                request.model,
                DEFAULT_MODELS.join(", ")
            )));
        }
        let run =
            fixture_training_run(&series, std::slice::from_ref(&request.model), request.test_size)?;

        let predictions = run.predictions.get(&request.model).cloned().unwrap_or_default();
        let residuals: Vec<f64> = run
            .actual
            .iter()
            .zip(&predictions)
            .map(|(a, p)| a - p)
            .collect();
        let mean_residual = mean(&residuals);
        let residual_std = population_std(&residuals);

        Ok(SingleModelRun {
            model: request.model.clone(),
            metric: run.metrics[0].clone(),
            mean_residual,
            residual_std,
            actual: run.actual,
            predictions,
            test_dates: run.test_dates,
            residuals,
        })
    }

    async fn generate_forecast(&self, request: &ForecastRequest) -> BackendResult<ForecastResult> {
        self.begin(Operation::GenerateForecast).await?;
        let run = self.require_last_run("Please run comprehensive analysis first to train models")?;
        let series = self.require_series()?;

        let model = if request.model_name.is_empty() || request.model_name == BEST_MODEL_ALIAS {
            run.best_model.clone()
        } else {
            request.model_name.clone()
        };
        let factor = model_factor(&model).ok_or_else(|| {
            BackendError::Rejected(format!("Forecast generation failed: unknown model '{}'", model))
        })?;

        let last_value = series.values.last().copied().unwrap_or_default();
        let months = request.months as usize;
        let start = series
            .last_date()
            .and_then(parse_month)
            .and_then(|d| d.checked_add_months(Months::new(1)));
        let forecast_values: Vec<f64> = (1..=months)
            .map(|step| last_value * factor * (1.0 + 0.005 * step as f64))
            .collect();
        let std = sample_std(&series.values).unwrap_or_default();

        Ok(ForecastResult {
            forecast_dates: month_labels(start, months),
            upper_bound: Some(forecast_values.iter().map(|v| v + 1.96 * std).collect()),
            lower_bound: Some(forecast_values.iter().map(|v| v - 1.96 * std).collect()),
            forecast_values,
            model_used: Some(model),
        })
    }
}

#[async_trait]
impl InsightSource for LocalBackend {
    async fn ai_insights(&self, request: &InsightsRequest) -> BackendResult<String> {
        self.begin(Operation::AiInsights).await?;
        let best = request
            .metrics_df
            .iter()
            .find(|m| m.model == request.best_model)
            .ok_or_else(|| BackendError::Rejected("best model has no metrics".to_string()))?;

        Ok(format!(
            "## Executive Summary\n\n{} delivered the lowest error with a MAPE of {:.2}% \
             across {} test periods.\n\n## Recommendations\n\n- Use {} for the next planning cycle\n\
             - Re-train when new monthly actuals arrive",
            best.model,
            best.mape,
            request.actual_data.len(),
            best.model
        ))
    }

    async fn seasonality_analysis(&self) -> BackendResult<SeasonalityAnalysis> {
        self.begin(Operation::SeasonalityAnalysis).await?;
        let series = self.require_series()?;

        let component = seasonal_component(&series.values);
        let strength = match (population_std(&component), population_std(&series.values)) {
            (Some(c), Some(s)) if s > 0.0 => c / s * 100.0,
            _ => 0.0,
        };
        let peak_month = series
            .values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .and_then(|(i, _)| series.dates.get(i))
            .and_then(|label| parse_month(label))
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default();

        Ok(SeasonalityAnalysis {
            seasonality_strength: strength,
            growth_rate: growth_rate(&series.values),
            peak_month,
            seasonal_data: SeasonalComponent {
                dates: series.dates,
                seasonal_component: component,
            },
        })
    }

    async fn feature_importance(&self) -> BackendResult<FeatureImportance> {
        self.begin(Operation::FeatureImportance).await?;
        let run = self.require_last_run("Models not trained")?;
        let ml_metrics: Vec<ModelMetric> = run
            .metrics
            .iter()
            .filter(|m| ML_MODELS.contains(&m.model.as_str()))
            .cloned()
            .collect();
        let best_ml = select_best_model(&ml_metrics)
            .map_err(|_| BackendError::Rejected("No ML models trained".to_string()))?;

        Ok(FeatureImportance {
            model_name: best_ml.model.clone(),
            features: DEMO_FEATURES.iter().map(|(f, _)| f.to_string()).collect(),
            importances: DEMO_FEATURES.iter().map(|(_, w)| *w).collect(),
        })
    }

    async fn advanced_analytics(&self) -> BackendResult<AdvancedAnalytics> {
        self.begin(Operation::AdvancedAnalytics).await?;
        let run = self.require_last_run("Data not loaded or models not trained")?;
        let series = self.require_series()?;

        let trend_strength = match linear_slope(&series.values) {
            Some(slope) => {
                let direction = if slope > 0.0 {
                    "Increasing"
                } else if slope < 0.0 {
                    "Decreasing"
                } else {
                    "Stable"
                };
                let avg = mean(&series.values).unwrap_or(1.0);
                format!("{:.1}% ({})", slope.abs() / avg * 100.0, direction)
            }
            None => "N/A".to_string(),
        };

        let component = seasonal_component(&series.values);
        let strength = match (population_std(&component), sample_std(&series.values)) {
            (Some(c), Some(s)) if s > 0.0 => c / s * 100.0,
            _ => 0.0,
        };
        let seasonality_detected = if strength > 20.0 {
            format!("Yes ({:.1}% strength)", strength)
        } else if strength > 10.0 {
            format!("Moderate ({:.1}% strength)", strength)
        } else {
            format!("Low ({:.1}% strength)", strength)
        };

        let has_ml = run.models().any(|m| ML_MODELS.contains(&m));
        let best_feature = if has_ml { DEMO_FEATURES[0].0 } else { "N/A" }.to_string();

        let model_consensus = match model_consensus(&run.metrics) {
            Some(consensus) => {
                let label = match consensus.level {
                    ConsensusLevel::High => "High Agreement",
                    ConsensusLevel::Moderate => "Moderate Agreement",
                    ConsensusLevel::Low => "Low Agreement",
                };
                format!("{} (CV: {:.1}%)", label, consensus.coefficient_of_variation)
            }
            None => "N/A".to_string(),
        };

        Ok(AdvancedAnalytics {
            trend_strength,
            seasonality_detected,
            best_feature,
            model_consensus,
        })
    }

    async fn export_data(&self) -> BackendResult<ExportFile> {
        self.begin(Operation::ExportData).await?;
        let run = self.require_last_run("No data or models to export")?;

        let mut csv = String::from("=== MODEL PERFORMANCE METRICS ===\n\nModel,MAPE,WAPE,MAE,RMSE\n");
        for m in &run.metrics {
            csv.push_str(&format!(
                "{},{:.4},{:.4},{:.2},{:.2}\n",
                m.model, m.mape, m.wape, m.mae, m.rmse
            ));
        }
        csv.push_str(&format!("\n\n=== SUMMARY ===\nBest Model: {}\n", run.best_model));
        csv.push_str("\n\n=== PREDICTIONS ===\n");
        for model in run.models() {
            if let Some(preds) = run.predictions.get(model) {
                let line: Vec<String> = preds.iter().map(|p| format!("{:.2}", p)).collect();
                csv.push_str(&format!("\n{} Predictions:\n{}\n", model, line.join(",")));
            }
        }

        Ok(ExportFile {
            file_name: format!(
                "forecast_export_{}.csv",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ),
            bytes: csv.into_bytes(),
        })
    }
}

// ==================== Fixture helpers ====================

/// Scale applied to the actual value to produce each model's fixture prediction.
fn model_factor(model: &str) -> Option<f64> {
    match model {
        "Naive" => Some(1.0),
        "ARIMA" => Some(1.04),
        "Random_Forest" => Some(0.97),
        "XGBoost" => Some(1.02),
        _ => None,
    }
}

fn fixture_training_run(
    series: &HistoricalSeries,
    models: &[String],
    test_size: u32,
) -> BackendResult<ResultSet> {
    let test_size = test_size as usize;
    if test_size == 0 || test_size >= series.len() {
        return Err(BackendError::Rejected(format!(
            "Training failed: test_size {} does not fit {} observations",
            test_size,
            series.len()
        )));
    }

    let split = series.len() - test_size;
    let actual = series.values[split..].to_vec();
    let test_dates = series.dates[split..].to_vec();

    let mut metrics = Vec::new();
    let mut predictions = HashMap::new();
    for model in models {
        // Unknown models are skipped, like a failed model on the service
        let Some(factor) = model_factor(model) else {
            continue;
        };
        if predictions.contains_key(model) {
            continue;
        }
        let preds: Vec<f64> = (split..series.len())
            .map(|i| {
                if model == "Naive" {
                    series.values[i - 1]
                } else {
                    series.values[i] * factor
                }
            })
            .collect();
        metrics.push(evaluate(model, &actual, &preds));
        predictions.insert(model.clone(), preds);
    }

    if metrics.is_empty() {
        return Err(BackendError::Rejected(
            "No models were trained successfully".to_string(),
        ));
    }

    let best_model = select_best_model(&metrics)
        .map(|m| m.model.clone())
        .unwrap_or_default();

    Ok(ResultSet {
        metrics,
        actual,
        predictions,
        test_dates,
        best_model,
    })
}

fn restrict_to_models(fixture: &ResultSet, models: &[String]) -> BackendResult<ResultSet> {
    let mut metrics: Vec<ModelMetric> = Vec::new();
    for name in models {
        if metrics.iter().any(|m| &m.model == name) {
            continue;
        }
        if let Some(metric) = fixture.metric(name) {
            metrics.push(metric.clone());
        }
    }
    if metrics.is_empty() {
        return Err(BackendError::Rejected(
            "No models were trained successfully".to_string(),
        ));
    }

    let predictions = metrics
        .iter()
        .filter_map(|m| {
            fixture
                .predictions
                .get(&m.model)
                .map(|p| (m.model.clone(), p.clone()))
        })
        .collect();
    let best_model = if metrics.iter().any(|m| m.model == fixture.best_model) {
        fixture.best_model.clone()
    } else {
        select_best_model(&metrics).map(|m| m.model.clone()).unwrap_or_default()
    };

    Ok(ResultSet {
        metrics,
        actual: fixture.actual.clone(),
        predictions,
        test_dates: fixture.test_dates.clone(),
        best_model,
    })
}

fn evaluate(model: &str, actual: &[f64], predicted: &[f64]) -> ModelMetric {
    let n = actual.len() as f64;
    let abs_errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).collect();
    let mape = actual
        .iter()
        .zip(&abs_errors)
        .map(|(a, e)| e / a.abs())
        .sum::<f64>()
        / n
        * 100.0;
    let wape = abs_errors.iter().sum::<f64>() / actual.iter().map(|a| a.abs()).sum::<f64>() * 100.0;
    let mae = abs_errors.iter().sum::<f64>() / n;
    let rmse = (abs_errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    ModelMetric::new(model, mape, wape, mae, rmse)
}

fn dataset_from_series(series: HistoricalSeries) -> LoadedDataset {
    let values = &series.values;
    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if sorted.is_empty() {
        None
    } else if sorted.len() % 2 == 0 {
        Some((sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0)
    } else {
        Some(sorted[sorted.len() / 2])
    };

    let first_date = series.dates.first().and_then(|d| parse_month(d));
    let last_date = series.last_date().and_then(parse_month);
    let epoch = NaiveDate::default();

    let stats = DatasetStats {
        total_months: values.len(),
        avg_sales: mean(values).unwrap_or_default(),
        max_sales: sorted.last().copied(),
        min_sales: sorted.first().copied(),
        growth_rate: growth_rate(values),
        std_sales: sample_std(values).unwrap_or_default(),
        median_sales: median,
        start_date: first_date.unwrap_or(epoch),
        end_date: last_date.unwrap_or(epoch),
    };

    LoadedDataset {
        series,
        profile: DatasetProfile {
            stats,
            features: FeatureGroups {
                lag: vec!["Lag_1".into(), "Lag_2".into(), "Lag_3".into(), "Lag_12".into()],
                seasonal: vec!["Month".into(), "Quarter".into(), "Season".into()],
                rolling: vec!["Rolling_Mean_3".into(), "Rolling_Mean_6".into()],
            },
            quality: Some(QualityMetrics {
                missing_values: 0,
                outliers: 0,
                data_completeness: 100.0,
            }),
        },
    }
}

/// Parse a `YYYY-MM` period label into the first day of that month.
fn parse_month(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", label.trim()), "%Y-%m-%d").ok()
}

/// `count` consecutive `YYYY-MM` labels starting at `start`.
fn month_labels(start: Option<NaiveDate>, count: usize) -> Vec<String> {
    match start {
        Some(start) => (0..count as u32)
            .filter_map(|i| start.checked_add_months(Months::new(i)))
            .map(|d| d.format("%Y-%m").to_string())
            .collect(),
        None => (1..=count).map(|i| format!("T+{}", i)).collect(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some((values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt())
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some((values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64).sqrt())
}

fn growth_rate(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if *first != 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}

/// Deviation from a centred three-month rolling mean (zero at the edges).
fn seasonal_component(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i == 0 || i + 1 >= values.len() {
                0.0
            } else {
                values[i] - (values[i - 1] + values[i] + values[i + 1]) / 3.0
            }
        })
        .collect()
}

/// Least-squares slope of the series against its index.
fn linear_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
        let dx = i as f64 - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });
    Some(num / den)
}
