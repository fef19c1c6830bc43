//! Caller-side resampling. The store hands out raw daily periods; any
//! day→month aggregation is this pure function, not store state.

use crate::observation::Observation;

/// Monthly totals over a slice of (revision-collapsed) daily observations.
///
/// Returns `(year, month, total)` tuples in chronological order.
pub fn resample_monthly(observations: &[Observation]) -> Vec<(i32, u32, f64)> {
    let mut out: Vec<(i32, u32, f64)> = Vec::new();
    for obs in observations {
        let (year, month) = obs.period.year_month();
        match out.last_mut() {
            Some((y, m, total)) if *y == year && *m == month => *total += obs.value,
            _ => out.push((year, month, obs.value)),
        }
    }
    out
}
