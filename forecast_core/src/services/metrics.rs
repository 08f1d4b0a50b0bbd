//! Reductions over per-model metrics: best model, average accuracy, consensus.

use crate::api::{ConsensusLevel, ModelConsensus, ModelMetric, ResultSummary};
use crate::error::{AnalysisError, AnalysisResult};

/// Coefficient of variation (percent) below which models are in high agreement.
const HIGH_AGREEMENT_CV: f64 = 15.0;
/// Coefficient of variation (percent) below which models are in moderate agreement.
const MODERATE_AGREEMENT_CV: f64 = 30.0;

/// Return the metric with the lowest MAPE.
///
/// Ties go to the earliest entry: the reduction only replaces the running
/// best on a strictly smaller MAPE. NaN entries lose to any number; if every
/// MAPE is NaN the first entry is returned.
pub fn select_best_model(metrics: &[ModelMetric]) -> AnalysisResult<&ModelMetric> {
    let (first, rest) = metrics.split_first().ok_or_else(|| {
        AnalysisError::EmptyInput("cannot select a best model from zero metrics".to_string())
    })?;

    Ok(rest.iter().fold(first, |best, current| {
        let replaces_nan = best.mape.is_nan() && !current.mape.is_nan();
        if current.mape < best.mape || replaces_nan {
            current
        } else {
            best
        }
    }))
}

/// `100 - mean(MAPE)`.
///
/// A rough accuracy proxy; it goes negative when the mean MAPE exceeds 100
/// and is deliberately not clamped.
pub fn average_accuracy(metrics: &[ModelMetric]) -> AnalysisResult<f64> {
    if metrics.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "cannot average the accuracy of zero metrics".to_string(),
        ));
    }
    let mean_mape = metrics.iter().map(|m| m.mape).sum::<f64>() / metrics.len() as f64;
    Ok(100.0 - mean_mape)
}

/// Headline figures for the overview panel.
pub fn summarize(metrics: &[ModelMetric]) -> AnalysisResult<ResultSummary> {
    let best = select_best_model(metrics)?;
    Ok(ResultSummary {
        best_model: best.model.clone(),
        best_mape: best.mape,
        average_accuracy: average_accuracy(metrics)?,
        models_trained: metrics.len(),
    })
}

/// How closely the models agree, from the spread of their MAPE values.
///
/// Uses the population standard deviation over the mean. Returns `None` for
/// fewer than two models or a zero mean.
pub fn model_consensus(metrics: &[ModelMetric]) -> Option<ModelConsensus> {
    if metrics.len() < 2 {
        return None;
    }

    let n = metrics.len() as f64;
    let mean = metrics.iter().map(|m| m.mape).sum::<f64>() / n;
    if mean == 0.0 || !mean.is_finite() {
        return None;
    }

    let variance = metrics.iter().map(|m| (m.mape - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean * 100.0;

    let level = if cv < HIGH_AGREEMENT_CV {
        ConsensusLevel::High
    } else if cv < MODERATE_AGREEMENT_CV {
        ConsensusLevel::Moderate
    } else {
        ConsensusLevel::Low
    };

    Some(ModelConsensus {
        level,
        coefficient_of_variation: cv,
    })
}
