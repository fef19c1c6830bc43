//! Per-entity engine configuration.
//!
//! Thresholds are configuration, not constants, so they can vary per
//! entity/category. Invalid configuration is scoped to the affected entity
//! (the orchestrator falls back to defaults); it is never fatal for the
//! process.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How the orchestrator picks a model backend for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    /// Rank recent accuracy records: lowest MAPE wins, ties broken by RMSE.
    Auto,
    /// Pin a backend by name (validated against the known model set).
    Fixed(String),
}

/// Per-entity/category tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub backend: BackendChoice,
    /// Number of future periods a forecast covers.
    pub horizon: usize,
    /// Confidence level for forecast intervals, in (0, 1).
    pub confidence_level: f64,
    /// Days-of-stock below which inventory is `low`.
    pub low_stock_threshold_days: f64,
    /// Days-of-stock above which inventory is `overstock`.
    pub overstock_threshold_days: f64,
    /// Sigma multiplier for anomaly detection ("3-sigma" default).
    pub anomaly_k: f64,
    /// Rolling baseline length for anomaly detection, periods.
    pub anomaly_lookback: usize,
    /// MAPE above this emits a forecast-degraded signal.
    pub accuracy_floor_mape: f64,
    /// Season length, periods (weekly cycle for daily data).
    pub seasonal_period: usize,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            horizon: 30,
            confidence_level: 0.90,
            low_stock_threshold_days: 10.0,
            overstock_threshold_days: 90.0,
            anomaly_k: 3.0,
            anomaly_lookback: 14,
            accuracy_floor_mape: 0.25,
            seasonal_period: 7,
        }
    }
}

impl EntityConfig {
    /// Validate the configuration.
    ///
    /// Model names inside `BackendChoice::Fixed` are validated where the
    /// model set is known (the forecast crate); this checks everything else.
    pub fn validate(&self) -> EngineResult<()> {
        if self.horizon == 0 {
            return Err(EngineError::configuration("horizon must be at least 1"));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(EngineError::configuration(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.low_stock_threshold_days < 0.0
            || self.overstock_threshold_days <= self.low_stock_threshold_days
        {
            return Err(EngineError::configuration(format!(
                "stock thresholds must satisfy 0 <= low < overstock, got low={} overstock={}",
                self.low_stock_threshold_days, self.overstock_threshold_days
            )));
        }
        if !(self.anomaly_k.is_finite() && self.anomaly_k > 0.0) {
            return Err(EngineError::configuration(
                "anomaly_k must be a finite positive number",
            ));
        }
        if self.anomaly_lookback < 2 {
            return Err(EngineError::configuration(
                "anomaly_lookback must be >= 2 to compute a baseline",
            ));
        }
        if !(self.accuracy_floor_mape.is_finite() && self.accuracy_floor_mape > 0.0) {
            return Err(EngineError::configuration(
                "accuracy_floor_mape must be a finite positive number",
            ));
        }
        if self.seasonal_period < 2 {
            return Err(EngineError::configuration(
                "seasonal_period must be >= 2",
            ));
        }
        Ok(())
    }

    pub fn with_backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    pub fn with_stock_thresholds(mut self, low_days: f64, overstock_days: f64) -> Self {
        self.low_stock_threshold_days = low_days;
        self.overstock_threshold_days = overstock_days;
        self
    }

    pub fn with_anomaly(mut self, k: f64, lookback: usize) -> Self {
        self.anomaly_k = k;
        self.anomaly_lookback = lookback;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EntityConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let cfg = EntityConfig::default().with_stock_thresholds(90.0, 10.0);
        assert!(matches!(
            cfg.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn confidence_level_must_be_a_proper_fraction() {
        let cfg = EntityConfig::default().with_confidence_level(1.0);
        assert!(cfg.validate().is_err());
        let cfg = EntityConfig::default().with_confidence_level(0.95);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_horizon_is_rejected() {
        assert!(EntityConfig::default().with_horizon(0).validate().is_err());
    }
}
