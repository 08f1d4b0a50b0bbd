//! Domain data transfer objects shared by the orchestrator, the aggregation
//! services and the backend clients.
//!
//! ## Design Guidelines
//!
//! 1. **Wire names at the edge**: serde renames mirror the analytics service
//!    (`Model`, `MAPE`, `R2_Score`, ...), Rust field names stay snake_case
//! 2. **Plain numbers**: percentages and currency amounts are `f64`
//! 3. **Absent points**: merged chart series use `Option<f64>` (`null` in JSON)
//! 4. **Immutable results**: a `ResultSet` is replaced in full, never patched

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Model identifiers understood by the analytics service, in request order.
pub const DEFAULT_MODELS: [&str; 4] = ["Naive", "ARIMA", "Random_Forest", "XGBoost"];

/// Model name that asks for the current best model of a training run.
pub const BEST_MODEL_ALIAS: &str = "best";

// =========================================================
// Training results
// =========================================================

/// One model's evaluation on the held-out test window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetric {
    #[serde(rename = "Model", alias = "model")]
    pub model: String,
    /// Mean absolute percentage error, in percent.
    #[serde(rename = "MAPE")]
    pub mape: f64,
    /// Weighted absolute percentage error, in percent.
    #[serde(rename = "WAPE")]
    pub wape: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(
        rename = "R2_Score",
        alias = "R2Score",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub r2_score: Option<f64>,
}

impl ModelMetric {
    /// Convenience constructor for a metric without an R² score.
    pub fn new(model: impl Into<String>, mape: f64, wape: f64, mae: f64, rmse: f64) -> Self {
        Self {
            model: model.into(),
            mape,
            wape,
            mae,
            rmse,
            r2_score: None,
        }
    }

    pub fn with_r2(mut self, r2_score: f64) -> Self {
        self.r2_score = Some(r2_score);
        self
    }
}

/// Outcome of one multi-model training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// One entry per trained model, in request order.
    pub metrics: Vec<ModelMetric>,
    /// Held-out test observations.
    pub actual: Vec<f64>,
    /// Predictions per model, index-aligned with `actual`.
    pub predictions: HashMap<String, Vec<f64>>,
    /// Period labels aligned with `actual`.
    pub test_dates: Vec<String>,
    pub best_model: String,
}

impl ResultSet {
    /// Check the structural invariants of a training run.
    ///
    /// Every prediction series has the length of `actual`, test dates are
    /// aligned with `actual`, and `metrics` holds exactly one entry per
    /// prediction key (and at least one entry overall).
    pub fn validate(&self) -> Result<(), String> {
        if self.metrics.is_empty() {
            return Err("training run returned no model metrics".to_string());
        }

        if self.test_dates.len() != self.actual.len() {
            return Err(format!(
                "test_dates has {} labels but actual has {} values",
                self.test_dates.len(),
                self.actual.len()
            ));
        }

        let mut seen = HashSet::with_capacity(self.metrics.len());
        for metric in &self.metrics {
            if !seen.insert(metric.model.as_str()) {
                return Err(format!("model '{}' has more than one metric entry", metric.model));
            }
        }
        if let Some(extra) = self.predictions.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(format!("predictions for '{}' have no metric entry", extra));
        }

        for metric in &self.metrics {
            let series = self.predictions.get(&metric.model).ok_or_else(|| {
                format!("no predictions for model '{}'", metric.model)
            })?;
            if series.len() != self.actual.len() {
                return Err(format!(
                    "model '{}' has {} predictions for {} actual values",
                    metric.model,
                    series.len(),
                    self.actual.len()
                ));
            }
        }

        Ok(())
    }

    /// Look up the metric entry for a model.
    pub fn metric(&self, model: &str) -> Option<&ModelMetric> {
        self.metrics.iter().find(|m| m.model == model)
    }

    /// Model identifiers in request order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.model.as_str())
    }
}

/// Result of training one model on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleModelRun {
    pub model: String,
    pub metric: ModelMetric,
    pub mean_residual: Option<f64>,
    pub residual_std: Option<f64>,
    pub actual: Vec<f64>,
    pub predictions: Vec<f64>,
    pub test_dates: Vec<String>,
    /// `actual - prediction`, per test period.
    pub residuals: Vec<f64>,
}

// =========================================================
// Historical data
// =========================================================

/// Observed sales per period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

impl HistoricalSeries {
    pub fn new(dates: Vec<String>, values: Vec<f64>) -> Result<Self, String> {
        if dates.len() != values.len() {
            return Err(format!(
                "historical series has {} dates but {} values",
                dates.len(),
                values.len()
            ));
        }
        Ok(Self { dates, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_date(&self) -> Option<&str> {
        self.dates.last().map(String::as_str)
    }
}

/// Summary statistics of the loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_months: usize,
    pub avg_sales: f64,
    #[serde(default)]
    pub max_sales: Option<f64>,
    #[serde(default)]
    pub min_sales: Option<f64>,
    /// First-to-last growth, in percent.
    pub growth_rate: f64,
    pub std_sales: f64,
    #[serde(default)]
    pub median_sales: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Engineered feature names, grouped the way the dashboard lists them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroups {
    #[serde(default, rename = "lag_features")]
    pub lag: Vec<String>,
    #[serde(default, rename = "seasonal_features")]
    pub seasonal: Vec<String>,
    #[serde(default, rename = "rolling_features")]
    pub rolling: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub missing_values: u64,
    pub outliers: u64,
    /// Share of non-missing cells, in percent.
    pub data_completeness: f64,
}

/// Everything the service reports about the dataset besides the series itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub stats: DatasetStats,
    #[serde(default)]
    pub features: FeatureGroups,
    #[serde(default)]
    pub quality: Option<QualityMetrics>,
}

/// Decoded `GET /load-data` response.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub series: HistoricalSeries,
    pub profile: DatasetProfile,
}

// =========================================================
// Forecasts
// =========================================================

/// Forward projection of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub forecast_dates: Vec<String>,
    pub forecast_values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl ForecastResult {
    pub fn new(forecast_dates: Vec<String>, forecast_values: Vec<f64>) -> Self {
        Self {
            forecast_dates,
            forecast_values,
            upper_bound: None,
            lower_bound: None,
            model_used: None,
        }
    }

    /// Dates and values (and bounds, when present) must be index-aligned.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.forecast_dates.len();
        if self.forecast_values.len() != n {
            return Err(format!(
                "forecast has {} dates but {} values",
                n,
                self.forecast_values.len()
            ));
        }
        for (name, bound) in [("upper_bound", &self.upper_bound), ("lower_bound", &self.lower_bound)] {
            if let Some(values) = bound {
                if values.len() != n {
                    return Err(format!("{} has {} values for {} dates", name, values.len(), n));
                }
            }
        }
        Ok(())
    }
}

// =========================================================
// Derived views
// =========================================================

/// Historical and forecast values on one shared label axis.
///
/// `None` marks a point that belongs to the other regime; charts must not
/// draw a line through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSeries {
    pub labels: Vec<String>,
    pub historical_values: Vec<Option<f64>>,
    pub forecast_values: Vec<Option<f64>>,
}

/// Optimistic / base / pessimistic projection of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub best: f64,
    pub base: f64,
    pub worst: f64,
}

/// Merged timeline plus scenarios, ready for the forecast panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastView {
    pub series: MergedSeries,
    pub scenarios: ScenarioProjection,
    pub forecast: ForecastResult,
}

/// Metrics split by accuracy thresholds. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub passing: Vec<ModelMetric>,
    pub failing: Vec<ModelMetric>,
}

/// Headline figures of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub best_model: String,
    pub best_mape: f64,
    /// `100 - mean(MAPE)`, unclamped.
    pub average_accuracy: f64,
    pub models_trained: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusLevel {
    High,
    Moderate,
    Low,
}

/// Agreement between models, measured on the spread of their MAPE values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConsensus {
    pub level: ConsensusLevel,
    /// Coefficient of variation of MAPE, in percent.
    pub coefficient_of_variation: f64,
}

/// One prediction line of the comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLine {
    pub model: String,
    pub values: Vec<f64>,
}

/// Actual vs. predicted values of every model over the test window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSeries {
    pub labels: Vec<String>,
    pub actual: Vec<f64>,
    pub lines: Vec<PredictionLine>,
}

// =========================================================
// Derived analytics panels
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalComponent {
    pub dates: Vec<String>,
    pub seasonal_component: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityAnalysis {
    pub seasonality_strength: f64,
    pub growth_rate: f64,
    pub peak_month: String,
    pub seasonal_data: SeasonalComponent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub model_name: String,
    pub features: Vec<String>,
    pub importances: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedAnalytics {
    pub trend_strength: String,
    pub seasonality_detected: String,
    pub best_feature: String,
    pub model_consensus: String,
}

/// Exported results as delivered by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
