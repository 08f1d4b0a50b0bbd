//! Best / base / worst case projections of a forecast.

use serde::{Deserialize, Serialize};

use crate::api::ScenarioProjection;
use crate::error::{AnalysisError, AnalysisResult};

/// Relative deviation applied around the mean forecast.
///
/// The default ±15% band is a fixed product constant. It is not derived from
/// prediction intervals or residual variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBand {
    /// `best = base * (1 + upside)`
    pub upside: f64,
    /// `worst = base * (1 - downside)`
    pub downside: f64,
}

impl ScenarioBand {
    pub const DEFAULT_RATIO: f64 = 0.15;

    pub fn new(upside: f64, downside: f64) -> Result<Self, String> {
        let band = Self { upside, downside };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.upside.is_finite() || self.upside < 0.0 {
            return Err(format!("scenario upside must be a non-negative number, got {}", self.upside));
        }
        if !self.downside.is_finite() || !(0.0..1.0).contains(&self.downside) {
            return Err(format!("scenario downside must be in [0, 1), got {}", self.downside));
        }
        Ok(())
    }

    pub fn best_multiplier(&self) -> f64 {
        1.0 + self.upside
    }

    pub fn worst_multiplier(&self) -> f64 {
        1.0 - self.downside
    }
}

impl Default for ScenarioBand {
    fn default() -> Self {
        Self {
            upside: Self::DEFAULT_RATIO,
            downside: Self::DEFAULT_RATIO,
        }
    }
}

/// Project scenarios with the default ±15% band.
pub fn project_scenarios(forecast_values: &[f64]) -> AnalysisResult<ScenarioProjection> {
    project_scenarios_with(forecast_values, &ScenarioBand::default())
}

/// `base` is the arithmetic mean of the forecast; `best` and `worst` scale it
/// by the band multipliers.
pub fn project_scenarios_with(
    forecast_values: &[f64],
    band: &ScenarioBand,
) -> AnalysisResult<ScenarioProjection> {
    if forecast_values.is_empty() {
        return Err(AnalysisError::EmptyInput(
            "cannot project scenarios from an empty forecast".to_string(),
        ));
    }

    let base = forecast_values.iter().sum::<f64>() / forecast_values.len() as f64;
    Ok(ScenarioProjection {
        best: base * band.best_multiplier(),
        base,
        worst: base * band.worst_multiplier(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_project_scenarios_two_values() {
        let s = project_scenarios(&[100.0, 200.0]).unwrap();
        assert_eq!(s.base, 150.0);
        assert!(approx(s.best, 172.5));
        assert!(approx(s.worst, 127.5));
    }

    #[test]
    fn test_project_scenarios_ratios() {
        let s = project_scenarios(&[80.0]).unwrap();
        assert_eq!(s.base, 80.0);
        assert!(approx(s.best / s.base, 1.15));
        assert!(approx(s.worst / s.base, 0.85));
    }

    #[test]
    fn test_default_multipliers() {
        let band = ScenarioBand::default();
        assert_eq!(band.best_multiplier(), 1.15);
        assert_eq!(band.worst_multiplier(), 0.85);
    }

    #[test]
    fn test_project_scenarios_empty() {
        assert!(matches!(project_scenarios(&[]), Err(AnalysisError::EmptyInput(_))));
    }

    #[test]
    fn test_custom_band() {
        let band = ScenarioBand::new(0.10, 0.20).unwrap();
        let s = project_scenarios_with(&[100.0], &band).unwrap();
        assert!(approx(s.best, 110.0));
        assert!(approx(s.worst, 80.0));
    }

    #[test]
    fn test_band_validation() {
        assert!(ScenarioBand::new(-0.1, 0.1).is_err());
        assert!(ScenarioBand::new(0.1, 1.0).is_err());
        assert!(ScenarioBand::new(f64::NAN, 0.1).is_err());
        assert!(ScenarioBand::new(0.0, 0.0).is_ok());
    }
}
