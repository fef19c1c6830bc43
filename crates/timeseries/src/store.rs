use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use stockcast_core::{EngineError, EntityId, Period, PeriodWindow};

use crate::observation::{Observation, TimeSeries};

/// Store operation error.
///
/// These are ordering/storage failures, as opposed to engine-level
/// computation errors. The orchestrator maps them into its per-entity
/// status via `EngineError`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Period precedes the newest closed period by more than the revision window.
    #[error("out-of-order period: attempted {attempted}, series is at {last}")]
    OutOfOrderPeriod { last: Period, attempted: Period },

    /// Period skips ahead, revision is non-sequential, or value is negative.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// Backend I/O failure (lock poisoning for the in-memory store).
    #[error("storage failure: {0}")]
    Io(String),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfOrderPeriod { last, attempted } => {
                EngineError::OutOfOrderPeriod { last, attempted }
            }
            other => EngineError::store(other.to_string()),
        }
    }
}

/// Append-only, per-entity observation log.
///
/// Implementations must:
/// - acknowledge an append only after it is durably applied
/// - serialize appends per entity (appends to different entities may
///   proceed concurrently)
/// - keep reads restartable: `read` is a pure function of the log
pub trait TimeSeriesStore: Send + Sync {
    /// Append one observation to the entity's log.
    ///
    /// A period newer than the log's tail must be exactly the next period
    /// (no gaps). A period at or behind the tail is accepted only as a
    /// revision inside the revision window, with a sequential revision
    /// number; older periods fail with `OutOfOrderPeriod`.
    fn append(&self, observation: Observation) -> Result<(), StoreError>;

    /// Period-ordered observations inside `window`, revisions collapsed.
    fn read(&self, entity_id: EntityId, window: PeriodWindow) -> Result<Vec<Observation>, StoreError>;

    /// Full series for the entity (revisions included), oldest first.
    fn series(&self, entity_id: EntityId) -> Result<TimeSeries, StoreError>;

    /// Newest period in the entity's log.
    fn last_period(&self, entity_id: EntityId) -> Result<Option<Period>, StoreError>;

    /// All tracked entities (created on first observation).
    fn entities(&self) -> Result<Vec<EntityId>, StoreError>;
}

impl<S> TimeSeriesStore for std::sync::Arc<S>
where
    S: TimeSeriesStore + ?Sized,
{
    fn append(&self, observation: Observation) -> Result<(), StoreError> {
        (**self).append(observation)
    }

    fn read(&self, entity_id: EntityId, window: PeriodWindow) -> Result<Vec<Observation>, StoreError> {
        (**self).read(entity_id, window)
    }

    fn series(&self, entity_id: EntityId) -> Result<TimeSeries, StoreError> {
        (**self).series(entity_id)
    }

    fn last_period(&self, entity_id: EntityId) -> Result<Option<Period>, StoreError> {
        (**self).last_period(entity_id)
    }

    fn entities(&self) -> Result<Vec<EntityId>, StoreError> {
        (**self).entities()
    }
}

/// In-memory append-only observation store.
///
/// Intended for tests/dev and as the reference for durable backends.
/// Appends take the map write lock (per-entity serialization via the map);
/// reads share the read lock.
#[derive(Debug)]
pub struct InMemoryTimeSeriesStore {
    logs: RwLock<HashMap<EntityId, Vec<Observation>>>,
    revision_window: usize,
}

impl Default for InMemoryTimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTimeSeriesStore {
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
            revision_window: 7,
        }
    }

    /// How many closed periods back a revision may still be appended.
    pub fn with_revision_window(mut self, revision_window: usize) -> Self {
        self.revision_window = revision_window;
        self
    }
}

impl TimeSeriesStore for InMemoryTimeSeriesStore {
    fn append(&self, observation: Observation) -> Result<(), StoreError> {
        if !observation.value.is_finite() || observation.value < 0.0 {
            return Err(StoreError::InvalidAppend(format!(
                "value must be finite and >= 0, got {}",
                observation.value
            )));
        }

        let mut logs = self
            .logs
            .write()
            .map_err(|_| StoreError::Io("lock poisoned".to_string()))?;

        let log = logs.entry(observation.entity_id).or_default();

        // Revisions append out of period order, so the tail is the maximum
        // period in the log, not the last-pushed element.
        let Some(tail) = log.iter().map(|o| o.period).max() else {
            if observation.revision != 0 {
                return Err(StoreError::InvalidAppend(
                    "first observation for an entity must be revision 0".to_string(),
                ));
            }
            log.push(observation);
            return Ok(());
        };

        if observation.period > tail {
            if observation.period != tail.next() {
                return Err(StoreError::InvalidAppend(format!(
                    "period gap: tail is {tail}, attempted {}",
                    observation.period
                )));
            }
            if observation.revision != 0 {
                return Err(StoreError::InvalidAppend(
                    "a new period must open at revision 0".to_string(),
                ));
            }
            log.push(observation);
            return Ok(());
        }

        // Closed period: only a revision inside the window is accepted.
        let age = tail.periods_since(observation.period);
        if age > self.revision_window as i64 {
            return Err(StoreError::OutOfOrderPeriod {
                last: tail,
                attempted: observation.period,
            });
        }

        let current = log
            .iter()
            .filter(|o| o.period == observation.period)
            .map(|o| o.revision)
            .max();
        match current {
            Some(rev) if observation.revision == rev + 1 => {
                log.push(observation);
                Ok(())
            }
            Some(rev) => Err(StoreError::InvalidAppend(format!(
                "revision must be {} for period {}, got {}",
                rev + 1,
                observation.period,
                observation.revision
            ))),
            None => Err(StoreError::InvalidAppend(format!(
                "no observation exists for period {} to revise",
                observation.period
            ))),
        }
    }

    fn read(&self, entity_id: EntityId, window: PeriodWindow) -> Result<Vec<Observation>, StoreError> {
        let series = self.series(entity_id)?;
        Ok(series
            .latest()
            .into_iter()
            .filter(|o| window.contains(o.period))
            .collect())
    }

    fn series(&self, entity_id: EntityId) -> Result<TimeSeries, StoreError> {
        let logs = self
            .logs
            .read()
            .map_err(|_| StoreError::Io("lock poisoned".to_string()))?;
        Ok(TimeSeries::new(
            logs.get(&entity_id).cloned().unwrap_or_default(),
        ))
    }

    fn last_period(&self, entity_id: EntityId) -> Result<Option<Period>, StoreError> {
        let logs = self
            .logs
            .read()
            .map_err(|_| StoreError::Io("lock poisoned".to_string()))?;
        Ok(logs
            .get(&entity_id)
            .and_then(|l| l.iter().map(|o| o.period).max()))
    }

    fn entities(&self) -> Result<Vec<EntityId>, StoreError> {
        let logs = self
            .logs
            .read()
            .map_err(|_| StoreError::Io("lock poisoned".to_string()))?;
        let mut ids: Vec<EntityId> = logs.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(day: u32) -> Period {
        Period::from_ymd(2025, 3, day).unwrap()
    }

    fn seeded(store: &InMemoryTimeSeriesStore, entity: EntityId, days: u32) {
        for d in 1..=days {
            store
                .append(Observation::new(entity, p(d), f64::from(d) * 10.0))
                .unwrap();
        }
    }

    #[test]
    fn append_then_read_round_trips_in_period_order() {
        let store = InMemoryTimeSeriesStore::new();
        let e = EntityId::new();
        seeded(&store, e, 5);

        let got = store.read(e, PeriodWindow::new(p(1), p(6))).unwrap();
        assert_eq!(got.len(), 5);
        for (i, obs) in got.iter().enumerate() {
            assert_eq!(obs.period, p(i as u32 + 1));
            assert_eq!(obs.value, (i as f64 + 1.0) * 10.0);
        }
    }

    #[test]
    fn read_is_limited_to_the_window() {
        let store = InMemoryTimeSeriesStore::new();
        let e = EntityId::new();
        seeded(&store, e, 10);

        let got = store.read(e, PeriodWindow::new(p(4), p(7))).unwrap();
        assert_eq!(
            got.iter().map(|o| o.period).collect::<Vec<_>>(),
            vec![p(4), p(5), p(6)]
        );
    }

    #[test]
    fn revision_supersedes_on_read_but_log_keeps_both() {
        let store = InMemoryTimeSeriesStore::new();
        let e = EntityId::new();
        seeded(&store, e, 3);

        store
            .append(Observation::new(e, p(2), 99.0).revised(1))
            .unwrap();

        let got = store.read(e, PeriodWindow::new(p(1), p(4))).unwrap();
        assert_eq!(got[1].value, 99.0);
        assert_eq!(store.series(e).unwrap().len(), 4);
    }

    #[test]
    fn appends_continue_past_a_revision() {
        let store = InMemoryTimeSeriesStore::new();
        let e = EntityId::new();
        seeded(&store, e, 3);

        // A correction lands at the end of the log; period 3 is still the
        // series tail and period 4 is the next valid append.
        store
            .append(Observation::new(e, p(2), 99.0).revised(1))
            .unwrap();
        assert_eq!(store.last_period(e).unwrap(), Some(p(3)));

        store.append(Observation::new(e, p(4), 40.0)).unwrap();
        assert_eq!(store.last_period(e).unwrap(), Some(p(4)));

        let got = store.read(e, PeriodWindow::new(p(1), p(5))).unwrap();
        assert_eq!(
            got.iter().map(|o| o.value).collect::<Vec<_>>(),
            vec![10.0, 99.0, 30.0, 40.0]
        );
    }

    #[test]
    fn revision_outside_window_is_out_of_order() {
        let store = InMemoryTimeSeriesStore::new().with_revision_window(2);
        let e = EntityId::new();
        seeded(&store, e, 10);

        let err = store
            .append(Observation::new(e, p(3), 1.0).revised(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrderPeriod { .. }));
    }

    #[test]
    fn period_gaps_are_rejected() {
        let store = InMemoryTimeSeriesStore::new();
        let e = EntityId::new();
        seeded(&store, e, 2);

        let err = store.append(Observation::new(e, p(5), 1.0)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidAppend(_)));
    }

    #[test]
    fn negative_values_are_rejected() {
        let store = InMemoryTimeSeriesStore::new();
        let e = EntityId::new();
        let err = store.append(Observation::new(e, p(1), -1.0)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidAppend(_)));
    }

    #[test]
    fn entities_lists_every_tracked_entity() {
        let store = InMemoryTimeSeriesStore::new();
        let (a, b) = (EntityId::new(), EntityId::new());
        store.append(Observation::new(a, p(1), 1.0)).unwrap();
        store.append(Observation::new(b, p(1), 2.0)).unwrap();

        let ids = store.entities().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));
    }
}
