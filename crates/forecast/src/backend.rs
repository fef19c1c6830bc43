use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use stockcast_core::{EngineError, EngineResult, EntityId};
use stockcast_timeseries::TimeSeries;

use crate::result::{ForecastPoint, ForecastResult};
use crate::stats::{linear_fit, mean, stddev_sample, z_for_confidence};

/// Closed set of forecasting model backends.
///
/// All variants satisfy the same contract: gapless forecast periods starting
/// immediately after the last observed period, interval bounds that bracket
/// the point value, and bands that widen as the horizon grows (uncertainty
/// compounds forward).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    /// Last observed value carried forward; band from one-step changes.
    Naive,
    /// Least-squares linear trend plus additive seasonal indices.
    SeasonalTrend { seasonal_period: usize },
    /// Mean of the trend fit and the seasonal-naive projection, with a
    /// small seeded perturbation.
    RegressionEnsemble { seasonal_period: usize },
}

/// Resolve a configured model name.
pub fn parse_model_name(name: &str, seasonal_period: usize) -> EngineResult<ModelBackend> {
    match name {
        "naive" => Ok(ModelBackend::Naive),
        "seasonal_trend" => Ok(ModelBackend::SeasonalTrend { seasonal_period }),
        "regression_ensemble" => Ok(ModelBackend::RegressionEnsemble { seasonal_period }),
        other => Err(EngineError::configuration(format!(
            "unknown model backend '{other}'"
        ))),
    }
}

/// Deterministic seed for one entity + horizon.
///
/// The same entity and horizon always perturb the same way, so forecasts
/// are reproducible for tests and idempotent re-runs.
pub fn forecast_seed(entity_id: EntityId, horizon: usize) -> u64 {
    entity_id
        .seed_bits()
        .wrapping_add((horizon as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

impl ModelBackend {
    pub fn model_name(&self) -> &'static str {
        match self {
            ModelBackend::Naive => "naive",
            ModelBackend::SeasonalTrend { .. } => "seasonal_trend",
            ModelBackend::RegressionEnsemble { .. } => "regression_ensemble",
        }
    }

    /// Shortest history the backend can fit.
    pub fn minimum_history(&self) -> usize {
        match self {
            ModelBackend::Naive => 3,
            ModelBackend::SeasonalTrend { seasonal_period }
            | ModelBackend::RegressionEnsemble { seasonal_period } => {
                2 * (*seasonal_period).max(2)
            }
        }
    }

    /// Fit the series and forecast `horizon` periods past its tail.
    ///
    /// Stateless and idempotent: identical series, horizon, confidence and
    /// seed produce an identical forecast (apart from `generated_at`).
    pub fn fit_and_forecast(
        &self,
        series: &TimeSeries,
        horizon: usize,
        confidence_level: f64,
        seed: u64,
    ) -> EngineResult<ForecastResult> {
        if horizon == 0 {
            return Err(EngineError::configuration("horizon must be at least 1"));
        }
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(EngineError::configuration(format!(
                "confidence_level must be in (0, 1), got {confidence_level}"
            )));
        }

        let observations = series.latest();
        let required = self.minimum_history();
        if observations.len() < required {
            return Err(EngineError::insufficient_history(
                required,
                observations.len(),
            ));
        }

        let entity_id = observations[0].entity_id;
        let basis_period = observations[observations.len() - 1].period;
        let values: Vec<f64> = observations.iter().map(|o| o.value).collect();

        let fit = match self {
            ModelBackend::Naive => fit_naive(&values, horizon),
            ModelBackend::SeasonalTrend { seasonal_period } => {
                fit_seasonal_trend(&values, horizon, (*seasonal_period).max(2))
            }
            ModelBackend::RegressionEnsemble { seasonal_period } => {
                fit_regression_ensemble(&values, horizon, (*seasonal_period).max(2), seed)
            }
        };

        let z = z_for_confidence(confidence_level);
        // Band floor keeps intervals from collapsing to zero width, so the
        // widening-with-horizon contract is observable even on perfect fits.
        let sigma = fit.residual_std.max(1e-6);

        let mut points = Vec::with_capacity(horizon);
        let mut period = basis_period;
        for (step, raw) in fit.points.into_iter().enumerate() {
            period = period.next();
            let point_value = raw.max(0.0);
            let half_width = z * sigma * ((step + 1) as f64).sqrt();
            points.push(ForecastPoint {
                period,
                point_value,
                lower_bound: (point_value - half_width).max(0.0),
                upper_bound: point_value + half_width,
            });
        }

        let result = ForecastResult {
            entity_id,
            model_name: self.model_name().to_string(),
            generated_at: Utc::now(),
            basis_period,
            horizon_periods: horizon,
            confidence_level,
            points,
        };
        result.validate()?;
        Ok(result)
    }
}

struct BackendFit {
    points: Vec<f64>,
    residual_std: f64,
}

fn fit_naive(values: &[f64], horizon: usize) -> BackendFit {
    let last = values[values.len() - 1];

    // One-step changes measure how well "carry the last value forward" fits.
    let mut changes = Vec::with_capacity(values.len() - 1);
    for pair in values.windows(2) {
        changes.push(pair[1] - pair[0]);
    }
    let residual_std = stddev_sample(&changes, mean(&changes));

    BackendFit {
        points: vec![last; horizon],
        residual_std,
    }
}

fn fit_seasonal_trend(values: &[f64], horizon: usize, seasonal_period: usize) -> BackendFit {
    let n = values.len();

    // Fit the trend on per-cycle means: averaging whole cycles cancels the
    // seasonal shape, so it cannot leak into the slope (a raw OLS fit over
    // a purely periodic series reports a spurious drift). Any trailing
    // partial cycle is left out of the trend fit.
    let cycles = n / seasonal_period;
    let (intercept, slope) = if cycles >= 2 {
        let cycle_means: Vec<f64> = (0..cycles)
            .map(|c| mean(&values[c * seasonal_period..(c + 1) * seasonal_period]))
            .collect();
        let (cycle_intercept, cycle_slope) = linear_fit(&cycle_means);
        let slope = cycle_slope / seasonal_period as f64;
        // A cycle's mean sits at the midpoint of its period indices.
        let intercept = cycle_intercept - slope * (seasonal_period as f64 - 1.0) / 2.0;
        (intercept, slope)
    } else {
        linear_fit(values)
    };

    // Additive seasonal indices over the detrended series, by phase.
    let mut sums = vec![0.0; seasonal_period];
    let mut counts = vec![0usize; seasonal_period];
    for (i, v) in values.iter().enumerate() {
        let detrended = v - (intercept + slope * i as f64);
        sums[i % seasonal_period] += detrended;
        counts[i % seasonal_period] += 1;
    }
    let seasonal: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
        .collect();

    let fitted = |i: usize| intercept + slope * i as f64 + seasonal[i % seasonal_period];

    let residuals: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, v)| v - fitted(i))
        .collect();
    let residual_std = stddev_sample(&residuals, mean(&residuals));

    let points = (0..horizon).map(|h| fitted(n + h)).collect();

    BackendFit {
        points,
        residual_std,
    }
}

fn fit_regression_ensemble(
    values: &[f64],
    horizon: usize,
    seasonal_period: usize,
    seed: u64,
) -> BackendFit {
    let n = values.len();
    let (intercept, slope) = linear_fit(values);

    // In-sample ensemble fit: mean of the trend line and the value one
    // season back. Only defined from the second season onward.
    let ensemble = |trend: f64, seasonal_naive: f64| 0.5 * (trend + seasonal_naive);

    let mut residuals = Vec::with_capacity(n.saturating_sub(seasonal_period));
    for i in seasonal_period..n {
        let trend = intercept + slope * i as f64;
        residuals.push(values[i] - ensemble(trend, values[i - seasonal_period]));
    }
    let residual_std = stddev_sample(&residuals, mean(&residuals));

    // Seeded perturbation replaces the unseeded noise the mock backends
    // used; +/-2% keeps forecasts plausible and reproducible.
    let mut rng = StdRng::seed_from_u64(seed);
    let points = (0..horizon)
        .map(|h| {
            let trend = intercept + slope * (n + h) as f64;
            let seasonal_naive = values[n - seasonal_period + (h % seasonal_period)];
            let perturbation: f64 = rng.gen_range(-0.02..=0.02);
            ensemble(trend, seasonal_naive) * (1.0 + perturbation)
        })
        .collect();

    BackendFit {
        points,
        residual_std,
    }
}
