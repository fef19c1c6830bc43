//! Backend selection order from accuracy records.

use crate::evaluate::AccuracyRecord;

/// Rank model names best-first: lowest MAPE wins, ties broken by lowest
/// RMSE. Records without a MAPE (all-zero actuals) rank after every record
/// that has one.
pub fn rank_backends(records: &[AccuracyRecord]) -> Vec<String> {
    let mut ordered: Vec<&AccuracyRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        match (a.mape, b.mape) {
            (Some(x), Some(y)) => x.total_cmp(&y).then(a.rmse.total_cmp(&b.rmse)),
            (Some(_), None) => core::cmp::Ordering::Less,
            (None, Some(_)) => core::cmp::Ordering::Greater,
            (None, None) => a.rmse.total_cmp(&b.rmse),
        }
    });
    ordered.into_iter().map(|r| r.model_name.clone()).collect()
}
