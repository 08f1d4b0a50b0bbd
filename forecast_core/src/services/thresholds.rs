//! Accuracy threshold filtering of trained models.

use serde::{Deserialize, Serialize};

use crate::api::{ModelMetric, ThresholdOutcome};

/// Upper bounds a model must stay within to pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCriteria {
    pub mape_max: f64,
    pub wape_max: f64,
}

impl ThresholdCriteria {
    pub fn new(mape_max: f64, wape_max: f64) -> Self {
        Self { mape_max, wape_max }
    }

    /// Both bounds must hold.
    pub fn evaluate(&self, metric: &ModelMetric) -> bool {
        metric.mape <= self.mape_max && metric.wape <= self.wape_max
    }

    /// Split metrics into passing and failing, preserving input order.
    pub fn partition(&self, metrics: &[ModelMetric]) -> ThresholdOutcome {
        let (passing, failing) = metrics.iter().cloned().partition(|m| self.evaluate(m));
        ThresholdOutcome { passing, failing }
    }
}

/// Partition metrics by `MAPE <= mape_max AND WAPE <= wape_max`.
///
/// Every metric lands in exactly one side. An empty input gives two empty
/// sides rather than an error.
pub fn apply_thresholds(metrics: &[ModelMetric], mape_max: f64, wape_max: f64) -> ThresholdOutcome {
    ThresholdCriteria::new(mape_max, wape_max).partition(metrics)
}
