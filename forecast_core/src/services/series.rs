//! Chart-ready series built from historical data, forecasts and training runs.

use crate::api::{
    ComparisonSeries, ForecastResult, HistoricalSeries, MergedSeries, PredictionLine, ResultSet,
};

/// Put historical and forecast values on one label axis.
///
/// Labels are the historical dates followed by the forecast dates, without
/// sorting or de-duplication. Each value series is padded with `None` over
/// the other regime, so both have `labels.len()` entries and no line is drawn
/// across the boundary.
pub fn merge_historical_and_forecast(
    historical: &HistoricalSeries,
    forecast: &ForecastResult,
) -> MergedSeries {
    let labels: Vec<String> = historical
        .dates
        .iter()
        .chain(&forecast.forecast_dates)
        .cloned()
        .collect();

    let historical_values = historical
        .values
        .iter()
        .copied()
        .map(Some)
        .chain(std::iter::repeat(None).take(forecast.forecast_values.len()))
        .collect();

    let forecast_values = std::iter::repeat(None)
        .take(historical.values.len())
        .chain(forecast.forecast_values.iter().copied().map(Some))
        .collect();

    MergedSeries {
        labels,
        historical_values,
        forecast_values,
    }
}

/// Actual test values against every model's predictions, in metric order.
pub fn compose_comparison(result_set: &ResultSet) -> ComparisonSeries {
    let lines = result_set
        .metrics
        .iter()
        .filter_map(|metric| {
            result_set
                .predictions
                .get(&metric.model)
                .map(|values| PredictionLine {
                    model: metric.model.clone(),
                    values: values.clone(),
                })
        })
        .collect();

    ComparisonSeries {
        labels: result_set.test_dates.clone(),
        actual: result_set.actual.clone(),
        lines,
    }
}
