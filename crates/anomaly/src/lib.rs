//! Anomaly detection over live demand series.
//!
//! Model:
//! - Compare each period against a rolling baseline (mean and standard
//!   deviation over the `lookback` periods immediately before it, the
//!   period under test excluded).
//! - Flag a `spike`/`drop` if the value leaves the `k`-sigma band.
//! - Flag a `stockout` when an expected-nonzero period reports zero.

use serde::{Deserialize, Serialize};

use stockcast_core::{EngineError, EngineResult, Period};
use stockcast_timeseries::TimeSeries;

/// Shortest baseline the detector will accept.
pub const MIN_LOOKBACK: usize = 14;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Spike,
    Drop,
    Stockout,
}

/// One statistically unusual period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub period: Period,
    pub kind: AnomalyKind,
    /// |z| for spike/drop; the baseline mean for a stockout.
    pub magnitude: f64,
}

/// Scan the series for anomalous periods.
///
/// Requires `lookback >= MIN_LOOKBACK` and a series long enough to give the
/// newest period a full baseline; fails with `InsufficientHistory`
/// otherwise (the orchestrator treats that as "skip this cycle", not a
/// hard failure).
pub fn detect(series: &TimeSeries, lookback: usize, k: f64) -> EngineResult<Vec<Anomaly>> {
    if lookback < MIN_LOOKBACK {
        return Err(EngineError::insufficient_history(MIN_LOOKBACK, lookback));
    }

    let observations = series.latest();
    if observations.len() < lookback + 1 {
        return Err(EngineError::insufficient_history(
            lookback + 1,
            observations.len(),
        ));
    }

    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let mut anomalies = Vec::new();

    for i in lookback..values.len() {
        let baseline = &values[i - lookback..i];
        let mean = mean(baseline);
        let std = stddev_sample(baseline, mean);
        let value = values[i];
        let period = observations[i].period;

        // Stockout wins over drop for the same period.
        if value == 0.0 && mean > 0.0 {
            anomalies.push(Anomaly {
                period,
                kind: AnomalyKind::Stockout,
                magnitude: mean,
            });
            continue;
        }

        // If std is ~0 any deviation from the baseline is suspect, but we
        // stay conservative and only flag exact-zero baselines via stockout.
        if std <= f64::EPSILON {
            continue;
        }

        let z = (value - mean) / std;
        if z > k {
            anomalies.push(Anomaly {
                period,
                kind: AnomalyKind::Spike,
                magnitude: z.abs(),
            });
        } else if z < -k {
            anomalies.push(Anomaly {
                period,
                kind: AnomalyKind::Drop,
                magnitude: z.abs(),
            });
        }
    }

    Ok(anomalies)
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1), deterministic.
fn stddev_sample(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcast_core::EntityId;
    use stockcast_timeseries::Observation;

    fn series_of(values: &[f64]) -> TimeSeries {
        let entity = EntityId::new();
        let mut period = Period::from_ymd(2025, 2, 1).unwrap();
        let mut obs = Vec::with_capacity(values.len());
        for v in values {
            obs.push(Observation::new(entity, period, *v));
            period = period.next();
        }
        TimeSeries::new(obs)
    }

    /// Baseline around 500 with mild noise, then one extreme period.
    fn noisy_baseline(tail: f64) -> Vec<f64> {
        let mut values: Vec<f64> = (0..90)
            .map(|i| 500.0 + if i % 2 == 0 { 50.0 } else { -50.0 })
            .collect();
        values.push(tail);
        values
    }

    #[test]
    fn zero_against_a_nonzero_baseline_is_a_stockout() {
        let series = series_of(&noisy_baseline(0.0));
        let anomalies = detect(&series, 14, 3.0).unwrap();

        let last = anomalies.last().unwrap();
        assert_eq!(last.kind, AnomalyKind::Stockout);
        assert!((last.magnitude - 500.0).abs() < 60.0);
    }

    #[test]
    fn extreme_high_value_is_a_spike() {
        let series = series_of(&noisy_baseline(2_000.0));
        let anomalies = detect(&series, 14, 3.0).unwrap();

        let last = anomalies.last().unwrap();
        assert_eq!(last.kind, AnomalyKind::Spike);
        assert!(last.magnitude > 3.0);
    }

    #[test]
    fn low_but_nonzero_value_is_a_drop() {
        let series = series_of(&noisy_baseline(10.0));
        let anomalies = detect(&series, 14, 3.0).unwrap();

        let last = anomalies.last().unwrap();
        assert_eq!(last.kind, AnomalyKind::Drop);
    }

    #[test]
    fn in_band_values_raise_nothing() {
        let series = series_of(&noisy_baseline(510.0));
        let anomalies = detect(&series, 14, 3.0).unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn short_lookback_is_insufficient_history() {
        let series = series_of(&noisy_baseline(0.0));
        let err = detect(&series, 7, 3.0).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientHistory {
                required: MIN_LOOKBACK,
                available: 7
            }
        );
    }

    #[test]
    fn short_series_is_insufficient_history() {
        let series = series_of(&[500.0; 10]);
        assert!(matches!(
            detect(&series, 14, 3.0),
            Err(EngineError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn constant_zero_baseline_never_reports_stockout() {
        let series = series_of(&[0.0; 30]);
        let anomalies = detect(&series, 14, 3.0).unwrap();
        assert!(anomalies.is_empty());
    }
}
