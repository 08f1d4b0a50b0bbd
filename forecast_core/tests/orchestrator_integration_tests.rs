//! Integration tests for the orchestrator against the in-memory service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use forecast_core::api::{
    DatasetProfile, HistoricalSeries, LoadedDataset, ModelMetric, ResultSet,
};
use forecast_core::backend::clients::{LocalBackend, Operation};
use forecast_core::backend::BackendError;
use forecast_core::services::{AnalysisOrchestrator, OrchestratorSettings, ScenarioBand};
use forecast_core::AnalysisError;

fn setup() -> (AnalysisOrchestrator, Arc<LocalBackend>) {
    let backend = Arc::new(LocalBackend::with_demo_data());
    (AnalysisOrchestrator::new(backend.clone()), backend)
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn fixture_result_set() -> ResultSet {
    let predictions: HashMap<String, Vec<f64>> = [
        ("A".to_string(), vec![101.0, 99.0]),
        ("B".to_string(), vec![108.0, 90.0]),
        ("C".to_string(), vec![100.5, 100.5]),
    ]
    .into_iter()
    .collect();

    ResultSet {
        metrics: vec![
            ModelMetric::new("A", 12.0, 9.0, 1.0, 1.0),
            ModelMetric::new("B", 8.5, 12.0, 9.0, 9.0),
            ModelMetric::new("C", 8.5, 4.0, 0.5, 0.5),
        ],
        actual: vec![100.0, 100.0],
        predictions,
        test_dates: vec!["2024-01".to_string(), "2024-02".to_string()],
        best_model: "B".to_string(),
    }
}

#[tokio::test]
async fn test_full_session_flow() {
    let (orchestrator, backend) = setup();

    let historical = orchestrator.load_historical_data().await.unwrap();
    assert_eq!(historical.len(), 24);
    assert_eq!(orchestrator.profile().unwrap().stats.total_months, 24);

    let result_set = orchestrator
        .run_training(&models(&["Naive", "ARIMA", "Random_Forest", "XGBoost"]), 3)
        .await
        .unwrap();
    assert_eq!(result_set.metrics.len(), 4);
    assert!(Arc::ptr_eq(&result_set, &orchestrator.result_set().unwrap()));

    let summary = orchestrator.summary().unwrap();
    assert_eq!(summary.best_model, result_set.best_model);
    assert_eq!(summary.models_trained, 4);

    let comparison = orchestrator.comparison().unwrap();
    assert_eq!(comparison.labels, result_set.test_dates);
    assert_eq!(comparison.lines.len(), 4);
    assert_eq!(comparison.lines[0].model, "Naive");

    let forecast = orchestrator.generate_forecast("best", 3).await.unwrap();
    let view = orchestrator.compose_forecast_view(forecast).unwrap();
    assert_eq!(view.series.labels.len(), 27);
    assert_eq!(view.series.historical_values.len(), 27);
    assert_eq!(view.series.forecast_values.len(), 27);
    assert!(view.series.historical_values[24].is_none());
    assert!(view.series.forecast_values[23].is_none());
    assert!(view.scenarios.best > view.scenarios.base);
    assert!(view.scenarios.worst < view.scenarios.base);

    assert_eq!(
        backend.calls(),
        vec![Operation::LoadData, Operation::TrainModels, Operation::GenerateForecast]
    );
}

#[tokio::test]
async fn test_empty_selection_does_not_touch_result_set() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();
    let before = orchestrator.run_training(&models(&["Naive"]), 3).await.unwrap();

    let err = orchestrator.run_training(&[], 3).await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    assert!(Arc::ptr_eq(&before, &orchestrator.result_set().unwrap()));
    assert_eq!(backend.call_count(Operation::TrainModels), 1);
}

#[tokio::test]
async fn test_forecast_before_training_is_precondition() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();

    let err = orchestrator.generate_forecast("Naive", 3).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Precondition(_)));
    assert_eq!(backend.call_count(Operation::GenerateForecast), 0);
}

#[tokio::test]
async fn test_failed_training_keeps_previous_run() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();
    let before = orchestrator.run_training(&models(&["Naive", "ARIMA"]), 3).await.unwrap();

    backend.fail_next(
        Operation::TrainModels,
        BackendError::Rejected("No models were trained successfully".into()),
    );
    let err = orchestrator.run_training(&models(&["XGBoost"]), 3).await.unwrap_err();
    assert_eq!(
        err,
        AnalysisError::TrainingFailed("No models were trained successfully".into())
    );
    assert!(Arc::ptr_eq(&before, &orchestrator.result_set().unwrap()));

    backend.fail_next(Operation::TrainModels, BackendError::Transport("connection reset".into()));
    let err = orchestrator.run_training(&models(&["XGBoost"]), 3).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Transport(_)));
    assert!(Arc::ptr_eq(&before, &orchestrator.result_set().unwrap()));
}

#[tokio::test]
async fn test_inconsistent_training_response_is_rejected() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();

    let mut broken = fixture_result_set();
    broken.predictions.insert("A".to_string(), vec![1.0]);
    backend.set_training_result(broken);

    let err = orchestrator.run_training(&models(&["A", "B"]), 2).await.unwrap_err();
    assert!(matches!(err, AnalysisError::TrainingFailed(_)));
    assert!(orchestrator.result_set().is_none());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_series() {
    let (orchestrator, backend) = setup();
    let before = orchestrator.load_historical_data().await.unwrap();

    backend.fail_next(Operation::LoadData, BackendError::Rejected("database offline".into()));
    let err = orchestrator.load_historical_data().await.unwrap_err();
    assert!(matches!(err, AnalysisError::DataUnavailable(ref msg) if msg.contains("database offline")));
    assert!(Arc::ptr_eq(&before, &orchestrator.historical().unwrap()));
}

#[tokio::test]
async fn test_thresholds_over_cached_run() {
    let (orchestrator, backend) = setup();
    backend.set_training_result(fixture_result_set());
    orchestrator.load_historical_data().await.unwrap();
    orchestrator.run_training(&models(&["A", "B", "C"]), 2).await.unwrap();

    let outcome = orchestrator.threshold_outcome(10.0, 10.0).unwrap();
    let passing: Vec<_> = outcome.passing.iter().map(|m| m.model.as_str()).collect();
    let failing: Vec<_> = outcome.failing.iter().map(|m| m.model.as_str()).collect();
    assert_eq!(passing, vec!["C"]);
    assert_eq!(failing, vec!["A", "B"]);

    // Ties on MAPE resolve to the earlier entry
    let summary = orchestrator.summary().unwrap();
    assert_eq!(summary.best_model, "B");
    assert!((summary.average_accuracy - (100.0 - 29.0 / 3.0)).abs() < 1e-9);
}

#[tokio::test]
async fn test_training_runs_are_serialized() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();
    backend.set_latency(Some(Duration::from_millis(50)));

    let first = models(&["Naive"]);
    let second = models(&["ARIMA", "XGBoost"]);
    let started = tokio::time::Instant::now();
    let (a, b) = tokio::join!(
        orchestrator.run_training(&first, 3),
        orchestrator.run_training(&second, 3),
    );
    assert!(started.elapsed() >= Duration::from_millis(100));

    assert_eq!(a.unwrap().metrics.len(), 1);
    let b = b.unwrap();
    assert!(Arc::ptr_eq(&b, &orchestrator.result_set().unwrap()));
    let trained: Vec<_> = b.models().collect();
    assert_eq!(trained, vec!["ARIMA", "XGBoost"]);
}

#[tokio::test]
async fn test_single_model_run_is_independent() {
    let (orchestrator, _) = setup();
    orchestrator.load_historical_data().await.unwrap();

    let mut parameters = serde_json::Map::new();
    parameters.insert("n_estimators".to_string(), serde_json::json!(200));
    let run = orchestrator
        .train_single_model("Random_Forest", 3, parameters.clone())
        .await
        .unwrap();
    assert_eq!(run.model, "Random_Forest");
    assert_eq!(run.residuals.len(), run.actual.len());
    assert!(orchestrator.result_set().is_none());

    let result_set = orchestrator.run_training(&models(&["Naive"]), 3).await.unwrap();
    orchestrator
        .train_single_model("XGBoost", 3, parameters)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&result_set, &orchestrator.result_set().unwrap()));
}

#[tokio::test]
async fn test_upload_reloads_series_and_keeps_run() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();
    let result_set = orchestrator.run_training(&models(&["Naive"]), 3).await.unwrap();

    let profile: DatasetProfile = orchestrator.profile().unwrap().as_ref().clone();
    backend.stage_upload(LoadedDataset {
        series: HistoricalSeries::new(
            vec!["2024-01".into(), "2024-02".into()],
            vec![10.0, 12.0],
        )
        .unwrap(),
        profile,
    });

    let series = orchestrator
        .upload_csv("sales.csv", b"Month,Sales\n2024-01,10\n2024-02,12\n".to_vec())
        .await
        .unwrap();
    assert_eq!(series.values, vec![10.0, 12.0]);
    assert_eq!(backend.uploads(), vec![("sales.csv".to_string(), 34)]);
    assert!(Arc::ptr_eq(&result_set, &orchestrator.result_set().unwrap()));
}

#[tokio::test]
async fn test_upload_validation() {
    let (orchestrator, backend) = setup();

    let err = orchestrator.upload_csv("sales.xlsx", vec![1, 2, 3]).await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    let err = orchestrator.upload_csv("sales.csv", Vec::new()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_analytics_panels_fail_soft() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();
    orchestrator
        .run_training(&models(&["Naive", "ARIMA", "XGBoost"]), 3)
        .await
        .unwrap();

    backend.fail_next(Operation::FeatureImportance, BackendError::Rejected("model busy".into()));
    let panels = orchestrator.load_analytics_panels().await;
    assert_eq!(panels.loaded(), 2);
    assert!(matches!(panels.feature_importance, Err(AnalysisError::Backend(_))));

    let seasonality = panels.seasonality.unwrap();
    assert_eq!(seasonality.seasonal_data.dates.len(), 24);
    assert_eq!(seasonality.peak_month, "December 2023");
    assert!(panels.advanced.unwrap().model_consensus.contains("CV"));

    let panels = orchestrator.load_analytics_panels().await;
    let importance = panels.feature_importance.unwrap();
    assert_eq!(importance.model_name, "XGBoost");
    assert_eq!(importance.features.len(), importance.importances.len());
}

#[tokio::test]
async fn test_insights_and_export_need_a_run() {
    let (orchestrator, backend) = setup();
    orchestrator.load_historical_data().await.unwrap();

    assert!(matches!(
        orchestrator.generate_insights().await,
        Err(AnalysisError::Precondition(_))
    ));
    assert!(matches!(
        orchestrator.export_current_results().await,
        Err(AnalysisError::Precondition(_))
    ));
    assert_eq!(backend.call_count(Operation::AiInsights), 0);
    assert_eq!(backend.call_count(Operation::ExportData), 0);

    orchestrator.run_training(&models(&["Naive", "XGBoost"]), 3).await.unwrap();
    let insights = orchestrator.generate_insights().await.unwrap();
    assert!(insights.contains("XGBoost"));

    let export = orchestrator.export_current_results().await.unwrap();
    assert!(export.file_name.starts_with("forecast_export_"));
    assert!(String::from_utf8(export.bytes).unwrap().contains("Best Model: XGBoost"));
}

#[tokio::test]
async fn test_configured_scenario_band() {
    let backend = Arc::new(LocalBackend::with_demo_data());
    let orchestrator = AnalysisOrchestrator::with_settings(
        backend,
        OrchestratorSettings {
            scenario_band: ScenarioBand::new(0.2, 0.1).unwrap(),
            ..OrchestratorSettings::default()
        },
    );
    orchestrator.load_historical_data().await.unwrap();
    orchestrator.run_training(&models(&["Naive"]), 3).await.unwrap();

    let forecast = orchestrator.generate_forecast("Naive", 2).await.unwrap();
    let base = forecast.forecast_values.iter().sum::<f64>() / 2.0;
    let view = orchestrator.compose_forecast_view(forecast).unwrap();
    assert!((view.scenarios.base - base).abs() < 1e-9);
    assert!((view.scenarios.best - base * 1.2).abs() < 1e-6);
    assert!((view.scenarios.worst - base * 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn test_forecast_view_requires_historical() {
    let (orchestrator, _) = setup();
    let forecast = forecast_core::api::ForecastResult::new(vec!["2024-01".into()], vec![1.0]);
    assert!(matches!(
        orchestrator.compose_forecast_view(forecast),
        Err(AnalysisError::Precondition(_))
    ));
}
