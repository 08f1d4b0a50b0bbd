//! Property tests for the aggregation functions.

use proptest::prelude::*;

use forecast_core::api::{ForecastResult, HistoricalSeries, ModelMetric};
use forecast_core::services::{
    apply_thresholds, average_accuracy, merge_historical_and_forecast, project_scenarios,
    select_best_model, ThresholdCriteria,
};

fn metric_strategy() -> impl Strategy<Value = ModelMetric> {
    ("[A-Z][a-z]{0,8}", 0.0f64..200.0, 0.0f64..200.0)
        .prop_map(|(model, mape, wape)| ModelMetric::new(model, mape, wape, 0.0, 0.0))
}

proptest! {
    #[test]
    fn best_model_has_minimal_mape(metrics in prop::collection::vec(metric_strategy(), 1..20)) {
        let best = select_best_model(&metrics).unwrap();
        let index = metrics.iter().position(|m| std::ptr::eq(m, best)).unwrap();

        for (i, m) in metrics.iter().enumerate() {
            prop_assert!(best.mape <= m.mape);
            if i < index {
                prop_assert!(m.mape > best.mape, "earlier entry {} ties the best", i);
            }
        }
    }

    #[test]
    fn best_model_ignores_nan_mape(
        metrics in prop::collection::vec(metric_strategy(), 1..20),
        nan_slots in prop::collection::vec(any::<bool>(), 20),
    ) {
        let mut with_nan = metrics.clone();
        for (metric, blank) in with_nan.iter_mut().zip(&nan_slots) {
            if *blank {
                metric.mape = f64::NAN;
            }
        }
        let best = select_best_model(&with_nan).unwrap();
        let numeric: Vec<f64> = with_nan.iter().map(|m| m.mape).filter(|m| !m.is_nan()).collect();
        if numeric.is_empty() {
            prop_assert!(std::ptr::eq(best, &with_nan[0]));
        } else {
            prop_assert!(!best.mape.is_nan());
            prop_assert!(numeric.iter().all(|m| best.mape <= *m));
        }
    }

    #[test]
    fn average_accuracy_is_complement_of_mean(metrics in prop::collection::vec(metric_strategy(), 1..20)) {
        let mean = metrics.iter().map(|m| m.mape).sum::<f64>() / metrics.len() as f64;
        let accuracy = average_accuracy(&metrics).unwrap();
        prop_assert!((accuracy - (100.0 - mean)).abs() < 1e-9);
    }

    #[test]
    fn merged_series_lengths_match_labels(
        historical in prop::collection::vec(-1e6f64..1e6, 0..40),
        forecast in prop::collection::vec(-1e6f64..1e6, 0..24),
    ) {
        let series = HistoricalSeries::new(
            (0..historical.len()).map(|i| format!("h{}", i)).collect(),
            historical.clone(),
        ).unwrap();
        let result = ForecastResult::new(
            (0..forecast.len()).map(|i| format!("f{}", i)).collect(),
            forecast.clone(),
        );

        let merged = merge_historical_and_forecast(&series, &result);
        prop_assert_eq!(merged.labels.len(), historical.len() + forecast.len());
        prop_assert_eq!(merged.historical_values.len(), merged.labels.len());
        prop_assert_eq!(merged.forecast_values.len(), merged.labels.len());

        // Exactly one side carries a value at every label
        for (h, f) in merged.historical_values.iter().zip(&merged.forecast_values) {
            prop_assert!(h.is_some() != f.is_some());
        }
    }

    #[test]
    fn scenarios_bracket_base(values in prop::collection::vec(0.0f64..1e6, 1..24)) {
        let projection = project_scenarios(&values).unwrap();
        let base = values.iter().sum::<f64>() / values.len() as f64;
        prop_assert!((projection.base - base).abs() <= 1e-9 * base.max(1.0));
        prop_assert_eq!(projection.best, projection.base * 1.15);
        prop_assert_eq!(projection.worst, projection.base * 0.85);
        prop_assert!(projection.worst <= projection.base && projection.base <= projection.best);
    }

    #[test]
    fn threshold_partition_is_total(
        metrics in prop::collection::vec(metric_strategy(), 0..20),
        mape_max in 0.0f64..200.0,
        wape_max in 0.0f64..200.0,
    ) {
        let outcome = apply_thresholds(&metrics, mape_max, wape_max);
        prop_assert_eq!(outcome.passing.len() + outcome.failing.len(), metrics.len());

        let criteria = ThresholdCriteria::new(mape_max, wape_max);
        prop_assert!(outcome.passing.iter().all(|m| criteria.evaluate(m)));
        prop_assert!(outcome.failing.iter().all(|m| !criteria.evaluate(m)));
        prop_assert_eq!(outcome, apply_thresholds(&metrics, mape_max, wape_max));
    }
}
