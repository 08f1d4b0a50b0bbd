//! Forecast command-line driver.
//!
//! Runs one full analysis against the configured analytics service and prints
//! a plain-text report: load data, train, summarize, filter by thresholds,
//! forecast with scenarios.
//!
//! # Usage
//!
//! ```bash
//! # Against the in-memory demo service
//! FORECAST_BACKEND=local cargo run --bin forecast-cli
//!
//! # Against a running analytics service
//! FORECAST_API_BASE=http://localhost:5000/api cargo run --bin forecast-cli
//! ```
//!
//! # Environment Variables
//!
//! - `FORECAST_BACKEND`: `http` or `local` (default: http)
//! - `FORECAST_API_BASE`: service base URL (default: http://localhost:5000/api)
//! - `FORECAST_TIMEOUT_SECS`: per-request timeout (default: 30)
//! - `FORECAST_MAPE_MAX`: MAPE threshold in percent (default: 15)
//! - `FORECAST_WAPE_MAX`: WAPE threshold in percent (default: 10)
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use forecast_core::backend::ForecastConfig;
use forecast_core::services::AnalysisOrchestrator;

fn threshold_from_env(key: &str, default: f64) -> anyhow::Result<f64> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let mut config = match ForecastConfig::from_default_location() {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            ForecastConfig::default()
        }
    };
    config.apply_env_overrides()?;

    let mape_max = threshold_from_env("FORECAST_MAPE_MAX", 15.0)?;
    let wape_max = threshold_from_env("FORECAST_WAPE_MAX", 10.0)?;

    let orchestrator = AnalysisOrchestrator::from_config(&config)?;
    if !orchestrator.health_check().await {
        warn!("Analytics service at {} did not answer", config.backend.base_url);
    }

    let historical = orchestrator.load_historical_data().await?;
    info!("Historical data: {} months", historical.len());
    if let Some(profile) = orchestrator.profile() {
        println!(
            "Dataset: {} months from {} to {}, average {:.2}, growth {:.1}%",
            profile.stats.total_months,
            profile.stats.start_date,
            profile.stats.end_date,
            profile.stats.avg_sales,
            profile.stats.growth_rate
        );
    }

    let result_set = orchestrator
        .run_training(&config.training.models, config.training.test_size)
        .await?;

    println!();
    println!("{:<16} {:>8} {:>8} {:>12} {:>12}", "Model", "MAPE", "WAPE", "MAE", "RMSE");
    for m in &result_set.metrics {
        println!(
            "{:<16} {:>7.2}% {:>7.2}% {:>12.2} {:>12.2}",
            m.model, m.mape, m.wape, m.mae, m.rmse
        );
    }

    let summary = orchestrator.summary()?;
    println!();
    println!(
        "Best model: {} (MAPE {:.2}%), average accuracy {:.1}%, {} model(s) trained",
        summary.best_model, summary.best_mape, summary.average_accuracy, summary.models_trained
    );

    let outcome = orchestrator.threshold_outcome(mape_max, wape_max)?;
    let names = |metrics: &[forecast_core::api::ModelMetric]| {
        metrics.iter().map(|m| m.model.as_str()).collect::<Vec<_>>().join(", ")
    };
    println!(
        "Thresholds MAPE <= {}%, WAPE <= {}%: passing [{}], failing [{}]",
        mape_max,
        wape_max,
        names(outcome.passing.as_slice()),
        names(outcome.failing.as_slice())
    );

    let forecast = orchestrator
        .generate_forecast(forecast_core::api::BEST_MODEL_ALIAS, config.training.forecast_months)
        .await?;
    let view = orchestrator.compose_forecast_view(forecast)?;

    println!();
    println!("Forecast ({}):", view.forecast.model_used.as_deref().unwrap_or(&summary.best_model));
    for (date, value) in view.forecast.forecast_dates.iter().zip(&view.forecast.forecast_values) {
        println!("  {}  {:>12.2}", date, value);
    }
    println!(
        "Scenarios: best {:.2}, base {:.2}, worst {:.2}",
        view.scenarios.best, view.scenarios.base, view.scenarios.worst
    );

    Ok(())
}
