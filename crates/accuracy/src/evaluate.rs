use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockcast_core::{EngineError, EngineResult, EntityId, Period, PeriodWindow};
use stockcast_forecast::{ForecastResult, ModelBackend, forecast_seed};
use stockcast_timeseries::{Observation, TimeSeries};

/// Accuracy of one model over one evaluation window.
///
/// Derived by joining forecast points to later observations on matching
/// period; only periods with both a forecast and a realized observation
/// contribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub entity_id: EntityId,
    pub model_name: String,
    pub evaluation_window: PeriodWindow,
    /// Mean absolute percentage error over periods with nonzero actuals.
    /// `None` when every joined period had a zero actual (a ratio against
    /// zero is undefined; reporting 0.0 here would be spuriously perfect).
    pub mape: Option<f64>,
    pub rmse: f64,
    pub mae: f64,
    pub sample_count: usize,
}

/// Join forecasts for one model to realized observations and score them.
///
/// Zero-actual periods are excluded from MAPE but included in RMSE/MAE —
/// a documented policy, not a silent drop. When a period was forecast more
/// than once, the most recently generated forecast wins.
///
/// Fails with `NoMatchingObservations` when zero periods qualify.
pub fn evaluate(
    entity_id: EntityId,
    model_name: &str,
    forecasts: &[ForecastResult],
    actuals: &[Observation],
    window: PeriodWindow,
) -> EngineResult<AccuracyRecord> {
    let realized: BTreeMap<Period, f64> = actuals
        .iter()
        .filter(|o| o.entity_id == entity_id && window.contains(o.period))
        .map(|o| (o.period, o.value))
        .collect();

    // Latest forecast wins per period.
    let mut predicted: BTreeMap<Period, f64> = BTreeMap::new();
    let mut ordered: Vec<&ForecastResult> = forecasts
        .iter()
        .filter(|f| f.entity_id == entity_id && f.model_name == model_name)
        .collect();
    ordered.sort_by_key(|f| f.generated_at);
    for forecast in ordered {
        for point in &forecast.points {
            if window.contains(point.period) {
                predicted.insert(point.period, point.point_value);
            }
        }
    }

    let mut abs_errors = Vec::new();
    let mut sq_errors = Vec::new();
    let mut pct_errors = Vec::new();
    for (period, predicted_value) in &predicted {
        let Some(actual) = realized.get(period) else {
            continue;
        };
        let err = actual - predicted_value;
        abs_errors.push(err.abs());
        sq_errors.push(err * err);
        if *actual != 0.0 {
            pct_errors.push(err.abs() / actual);
        }
    }

    if abs_errors.is_empty() {
        return Err(EngineError::NoMatchingObservations);
    }

    let n = abs_errors.len() as f64;
    Ok(AccuracyRecord {
        entity_id,
        model_name: model_name.to_string(),
        evaluation_window: window,
        mape: if pct_errors.is_empty() {
            None
        } else {
            Some(pct_errors.iter().sum::<f64>() / pct_errors.len() as f64)
        },
        rmse: (sq_errors.iter().sum::<f64>() / n).sqrt(),
        mae: abs_errors.iter().sum::<f64>() / n,
        sample_count: abs_errors.len(),
    })
}

/// Score a set of backends against the tail of a real series.
///
/// The series is split into a training head and a `holdout` tail; each
/// backend forecasts the holdout from the head and is evaluated against
/// the realized tail. Backends without enough training history are skipped.
pub fn backtest(
    entity_id: EntityId,
    series: &TimeSeries,
    backends: &[ModelBackend],
    holdout: usize,
    confidence_level: f64,
) -> Vec<AccuracyRecord> {
    let observations = series.latest();
    if holdout == 0 || observations.len() <= holdout {
        return Vec::new();
    }

    let (head, tail) = observations.split_at(observations.len() - holdout);
    let training = TimeSeries::new(head.to_vec());
    let window = PeriodWindow::new(tail[0].period, tail[tail.len() - 1].period.next());

    let mut records = Vec::new();
    for backend in backends {
        let seed = forecast_seed(entity_id, holdout);
        let Ok(forecast) =
            backend.fit_and_forecast(&training, holdout, confidence_level, seed)
        else {
            continue;
        };
        if let Ok(record) = evaluate(
            entity_id,
            backend.model_name(),
            std::slice::from_ref(&forecast),
            tail,
            window,
        ) {
            records.push(record);
        }
    }
    records
}
