use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcast_core::{EngineError, EngineResult, EntityId, Period};

/// One forecast period: point value plus interval bounds.
///
/// Invariant: `lower_bound <= point_value <= upper_bound`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: Period,
    pub point_value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// A published forecast for one entity.
///
/// Immutable once published; read-shared by the alert engine and the
/// service facade. `basis_period` is the last observed period the forecast
/// was generated from — a re-run against an unchanged series produces the
/// same basis and is skipped by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub entity_id: EntityId,
    pub model_name: String,
    pub generated_at: DateTime<Utc>,
    pub basis_period: Period,
    pub horizon_periods: usize,
    pub confidence_level: f64,
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Check the structural invariants every backend must satisfy.
    pub fn validate(&self) -> EngineResult<()> {
        if self.points.len() != self.horizon_periods {
            return Err(EngineError::configuration(format!(
                "horizon_periods is {} but {} points were produced",
                self.horizon_periods,
                self.points.len()
            )));
        }
        let mut expected = self.basis_period.next();
        for point in &self.points {
            if point.period != expected {
                return Err(EngineError::configuration(format!(
                    "forecast periods must be gapless: expected {expected}, got {}",
                    point.period
                )));
            }
            if !(point.lower_bound <= point.point_value
                && point.point_value <= point.upper_bound)
            {
                return Err(EngineError::configuration(format!(
                    "interval bounds out of order at {}",
                    point.period
                )));
            }
            expected = expected.next();
        }
        Ok(())
    }

    /// Total forecast demand over the horizon.
    pub fn total_demand(&self) -> f64 {
        self.points.iter().map(|p| p.point_value).sum()
    }

    /// The highest forecast period, if any.
    pub fn peak(&self) -> Option<&ForecastPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.point_value.total_cmp(&b.point_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(period: Period, value: f64) -> ForecastPoint {
        ForecastPoint {
            period,
            point_value: value,
            lower_bound: value - 1.0,
            upper_bound: value + 1.0,
        }
    }

    fn result(points: Vec<ForecastPoint>) -> ForecastResult {
        ForecastResult {
            entity_id: EntityId::new(),
            model_name: "naive".to_string(),
            generated_at: Utc::now(),
            basis_period: Period::from_ymd(2025, 1, 1).unwrap(),
            horizon_periods: points.len(),
            confidence_level: 0.9,
            points,
        }
    }

    #[test]
    fn gapless_consecutive_points_validate() {
        let p1 = Period::from_ymd(2025, 1, 2).unwrap();
        let r = result(vec![point(p1, 10.0), point(p1.next(), 12.0)]);
        assert!(r.validate().is_ok());
        assert_eq!(r.total_demand(), 22.0);
        assert_eq!(r.peak().unwrap().point_value, 12.0);
    }

    #[test]
    fn a_period_gap_fails_validation() {
        let p1 = Period::from_ymd(2025, 1, 2).unwrap();
        let r = result(vec![point(p1, 10.0), point(p1.offset(2), 12.0)]);
        assert!(r.validate().is_err());
    }

    #[test]
    fn inverted_bounds_fail_validation() {
        let p1 = Period::from_ymd(2025, 1, 2).unwrap();
        let mut bad = point(p1, 10.0);
        bad.lower_bound = 11.0;
        let r = result(vec![bad]);
        assert!(r.validate().is_err());
    }
}
