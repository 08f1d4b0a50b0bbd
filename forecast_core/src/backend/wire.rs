//! JSON wire format of the analytics service.
//!
//! Every response carries a `{success, message?}` envelope. Bodies are first
//! parsed as a generic JSON value, the envelope is checked, and only then is
//! the payload decoded into its typed shape (with the failing field path
//! reported by `serde_path_to_error`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::client::{BackendError, BackendResult};
use crate::api::{
    DatasetProfile, DatasetStats, FeatureGroups, HistoricalSeries, LoadedDataset, ModelMetric,
    QualityMetrics, ResultSet, SingleModelRun,
};
use crate::services::metrics::select_best_model;

/// File name used when the export response does not name one.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "forecast_export.csv";

// =========================================================
// Requests
// =========================================================

/// Body of `POST /train-models`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRequest {
    pub models: Vec<String>,
    pub test_size: u32,
}

/// Body of `POST /train-single-model`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleModelRequest {
    pub model: String,
    pub test_size: u32,
    /// Model-specific settings such as `order`, `n_estimators` or `max_depth`.
    pub parameters: Map<String, Value>,
}

/// Body of `POST /generate-forecast`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRequest {
    pub months: u32,
    pub model_name: String,
}

/// Body of `POST /ai-insights`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsRequest {
    pub metrics_df: Vec<ModelMetric>,
    pub best_model: String,
    pub actual_data: Vec<f64>,
    pub predictions_dict: HashMap<String, Vec<f64>>,
}

impl InsightsRequest {
    pub fn from_result_set(result_set: &ResultSet) -> Self {
        Self {
            metrics_df: result_set.metrics.clone(),
            best_model: result_set.best_model.clone(),
            actual_data: result_set.actual.clone(),
            predictions_dict: result_set.predictions.clone(),
        }
    }
}

// =========================================================
// Envelope
// =========================================================

/// Check the `success` flag of a response body.
///
/// Returns the body unchanged on success. A missing or false flag becomes
/// `BackendError::Rejected` carrying `message`, else `error`, else a generic text.
pub fn check_envelope(body: Value) -> BackendResult<Value> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(body),
        Some(false) => Err(BackendError::Rejected(failure_message(&body))),
        None => Err(BackendError::Rejected(
            "response is missing the success flag".to_string(),
        )),
    }
}

fn failure_message(body: &Value) -> String {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or("request failed")
        .to_string()
}

/// Decode a JSON value into a typed payload, reporting the failing path.
pub fn decode<T: DeserializeOwned>(value: Value) -> BackendResult<T> {
    Ok(serde_path_to_error::deserialize(value)?)
}

/// Parse a raw body, check its envelope and decode the payload.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> BackendResult<T> {
    let value: Value = serde_json::from_str(body)?;
    decode(check_envelope(value)?)
}

// =========================================================
// Responses
// =========================================================

#[derive(Debug, Deserialize)]
struct HistoricalData {
    dates: Vec<String>,
    sales: Vec<f64>,
}

/// Payload of `GET /load-data`.
#[derive(Debug, Deserialize)]
pub struct LoadDataPayload {
    stats: DatasetStats,
    historical_data: HistoricalData,
    #[serde(default)]
    features: FeatureGroups,
    #[serde(default)]
    quality: Option<QualityMetrics>,
}

impl LoadDataPayload {
    pub fn into_dataset(self) -> BackendResult<LoadedDataset> {
        let series = HistoricalSeries::new(self.historical_data.dates, self.historical_data.sales)
            .map_err(BackendError::Decode)?;
        Ok(LoadedDataset {
            series,
            profile: DatasetProfile {
                stats: self.stats,
                features: self.features,
                quality: self.quality,
            },
        })
    }
}

/// Payload of `POST /train-models`.
#[derive(Debug, Deserialize)]
pub struct TrainModelsPayload {
    metrics: Vec<ModelMetric>,
    actual: Vec<f64>,
    predictions: HashMap<String, Vec<f64>>,
    test_dates: Vec<String>,
    #[serde(default)]
    best_model: Option<String>,
}

impl TrainModelsPayload {
    /// Build the result set; a missing `best_model` is filled in locally.
    ///
    /// Structural invariants are not checked here, see [`ResultSet::validate`].
    pub fn into_result_set(self) -> ResultSet {
        let best_model = match self.best_model {
            Some(name) if !name.is_empty() => name,
            _ => select_best_model(&self.metrics)
                .map(|m| m.model.clone())
                .unwrap_or_default(),
        };
        ResultSet {
            metrics: self.metrics,
            actual: self.actual,
            predictions: self.predictions,
            test_dates: self.test_dates,
            best_model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SingleModelMetric {
    #[serde(flatten)]
    metric: ModelMetric,
    #[serde(default)]
    mean_residual: Option<f64>,
    #[serde(default)]
    residual_std: Option<f64>,
}

/// Payload of `POST /train-single-model`.
#[derive(Debug, Deserialize)]
pub struct SingleModelPayload {
    #[serde(default)]
    model: Option<String>,
    metrics: SingleModelMetric,
    actual: Vec<f64>,
    predictions: Vec<f64>,
    test_dates: Vec<String>,
    #[serde(default)]
    residuals: Option<Vec<f64>>,
}

impl SingleModelPayload {
    pub fn into_run(self) -> BackendResult<SingleModelRun> {
        if self.predictions.len() != self.actual.len() {
            return Err(BackendError::Decode(format!(
                "{} predictions for {} actual values",
                self.predictions.len(),
                self.actual.len()
            )));
        }

        let residuals = match self.residuals {
            Some(residuals) => residuals,
            None => self
                .actual
                .iter()
                .zip(&self.predictions)
                .map(|(actual, predicted)| actual - predicted)
                .collect(),
        };

        Ok(SingleModelRun {
            model: self.model.unwrap_or_else(|| self.metrics.metric.model.clone()),
            metric: self.metrics.metric,
            mean_residual: self.metrics.mean_residual,
            residual_std: self.metrics.residual_std,
            actual: self.actual,
            predictions: self.predictions,
            test_dates: self.test_dates,
            residuals,
        })
    }
}

/// Payload of `POST /ai-insights`.
#[derive(Debug, Deserialize)]
pub struct InsightsPayload {
    pub insights: String,
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// Accepts `filename=name.csv` and `filename="name.csv"`.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, value) = part.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case("filename") {
                return None;
            }
            let name = value.trim().trim_matches('"').trim();
            (!name.is_empty()).then(|| name.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ForecastResult, SeasonalityAnalysis};
    use serde_json::json;

    #[test]
    fn test_check_envelope_success() {
        let body = json!({"success": true, "insights": "ok"});
        assert!(check_envelope(body).is_ok());
    }

    #[test]
    fn test_check_envelope_prefers_message_then_error() {
        let err = check_envelope(json!({"success": false, "message": "Data not loaded"})).unwrap_err();
        assert_eq!(err, BackendError::Rejected("Data not loaded".into()));

        let err = check_envelope(json!({"success": false, "error": "Models not trained"})).unwrap_err();
        assert_eq!(err, BackendError::Rejected("Models not trained".into()));

        let err = check_envelope(json!({"success": false})).unwrap_err();
        assert_eq!(err, BackendError::Rejected("request failed".into()));
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        assert!(matches!(
            check_envelope(json!({"forecast_values": [1.0]})),
            Err(BackendError::Rejected(_))
        ));
    }

    #[test]
    fn test_decode_reports_path() {
        let body = r#"{"success": true, "forecast_dates": ["2025-01"], "forecast_values": ["x"]}"#;
        let err = decode_body::<ForecastResult>(body).unwrap_err();
        match err {
            BackendError::Decode(msg) => assert!(msg.contains("forecast_values"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_data_payload() {
        let body = r#"{
            "success": true,
            "stats": {"total_months": 2, "avg_sales": 105.0, "growth_rate": 10.0,
                      "std_sales": 7.07, "start_date": "2024-01-01", "end_date": "2024-02-01"},
            "historical_data": {"dates": ["2024-01", "2024-02"], "sales": [100.0, 110.0]},
            "features": {"lag_features": ["Lag_1"], "rolling_features": ["Rolling_Mean_3"]}
        }"#;
        let dataset = decode_body::<LoadDataPayload>(body).unwrap().into_dataset().unwrap();
        assert_eq!(dataset.series.values, vec![100.0, 110.0]);
        assert_eq!(dataset.profile.stats.total_months, 2);
        assert_eq!(dataset.profile.features.lag, vec!["Lag_1".to_string()]);
        assert!(dataset.profile.features.seasonal.is_empty());
        assert!(dataset.profile.quality.is_none());
        assert_eq!(
            dataset.profile.stats.end_date,
            chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_load_data_rejects_misaligned_series() {
        let body = r#"{
            "success": true,
            "stats": {"total_months": 2, "avg_sales": 105.0, "growth_rate": 10.0,
                      "std_sales": 7.07, "start_date": "2024-01-01", "end_date": "2024-02-01"},
            "historical_data": {"dates": ["2024-01"], "sales": [100.0, 110.0]}
        }"#;
        let payload = decode_body::<LoadDataPayload>(body).unwrap();
        assert!(matches!(payload.into_dataset(), Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_training_payload_fills_missing_best_model() {
        let body = r#"{
            "success": true,
            "metrics": [
                {"Model": "Naive", "MAPE": 12.0, "WAPE": 10.0, "MAE": 5.0, "RMSE": 6.0},
                {"Model": "ARIMA", "MAPE": 8.5, "WAPE": 7.0, "MAE": 4.0, "RMSE": 5.0}
            ],
            "actual": [10.0],
            "predictions": {"Naive": [9.0], "ARIMA": [10.5]},
            "test_dates": ["2024-06"],
            "best_model": null
        }"#;
        let rs = decode_body::<TrainModelsPayload>(body).unwrap().into_result_set();
        assert_eq!(rs.best_model, "ARIMA");
        assert!(rs.validate().is_ok());
    }

    #[test]
    fn test_single_model_payload_computes_residuals() {
        let body = r#"{
            "success": true,
            "model": "XGBoost",
            "metrics": {"Model": "XGBoost", "MAPE": 5.0, "WAPE": 4.0, "MAE": 3.0, "RMSE": 3.5,
                        "R2_Score": 0.9, "mean_residual": 0.5},
            "actual": [10.0, 20.0],
            "predictions": [9.0, 21.0],
            "test_dates": ["2024-05", "2024-06"]
        }"#;
        let run = decode_body::<SingleModelPayload>(body).unwrap().into_run().unwrap();
        assert_eq!(run.model, "XGBoost");
        assert_eq!(run.metric.r2_score, Some(0.9));
        assert_eq!(run.mean_residual, Some(0.5));
        assert_eq!(run.residual_std, None);
        assert_eq!(run.residuals, vec![1.0, -1.0]);
    }

    #[test]
    fn test_seasonality_payload() {
        let body = r#"{
            "success": true, "seasonality_strength": 22.5, "growth_rate": 4.0,
            "peak_month": "December 2023",
            "seasonal_data": {"dates": ["2023-12"], "seasonal_component": [1.5]}
        }"#;
        let panel = decode_body::<SeasonalityAnalysis>(body).unwrap();
        assert_eq!(panel.peak_month, "December 2023");
    }

    #[test]
    fn test_insights_request_uses_service_names() {
        let mut predictions = HashMap::new();
        predictions.insert("Naive".to_string(), vec![1.0]);
        let rs = ResultSet {
            metrics: vec![ModelMetric::new("Naive", 1.0, 1.0, 1.0, 1.0)],
            actual: vec![1.0],
            predictions,
            test_dates: vec!["2024-01".into()],
            best_model: "Naive".into(),
        };
        let value = serde_json::to_value(InsightsRequest::from_result_set(&rs)).unwrap();
        assert_eq!(value["best_model"], "Naive");
        assert_eq!(value["metrics_df"][0]["Model"], "Naive");
        assert_eq!(value["predictions_dict"]["Naive"][0], 1.0);
        assert_eq!(value["actual_data"][0], 1.0);
    }

    #[test]
    fn test_filename_from_content_disposition() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=forecast_export_20240101_120000.csv"),
            Some("forecast_export_20240101_120000.csv".to_string())
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=\"report.csv\""),
            Some("report.csv".to_string())
        );
        assert_eq!(filename_from_content_disposition("attachment"), None);
        assert_eq!(filename_from_content_disposition("attachment; filename=\"\""), None);
    }
}
