//! Published-analysis stores: latest-wins tables keyed by entity.
//!
//! Values are immutable once published; readers get clones. The alert
//! engine and the service facade read-share these through the map locks.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use stockcast_accuracy::AccuracyRecord;
use stockcast_core::{EngineError, EngineResult, EntityId};
use stockcast_forecast::ForecastResult;
use stockcast_inventory::{InventorySnapshot, StockStatus};

/// Latest-wins table keyed by entity.
#[derive(Debug, Default)]
pub struct LatestWinsStore<V> {
    inner: RwLock<HashMap<EntityId, V>>,
}

impl<V: Clone> LatestWinsStore<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn publish(&self, entity_id: EntityId, value: V) -> EngineResult<()> {
        self.inner
            .write()
            .map_err(|_| EngineError::store("lock poisoned"))?
            .insert(entity_id, value);
        Ok(())
    }

    pub fn latest(&self, entity_id: EntityId) -> EngineResult<Option<V>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| EngineError::store("lock poisoned"))?
            .get(&entity_id)
            .cloned())
    }
}

/// Latest published forecast per entity.
pub type ForecastStore = LatestWinsStore<ForecastResult>;

/// A snapshot together with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSnapshot {
    pub snapshot: InventorySnapshot,
    pub status: StockStatus,
    pub suggested_action: String,
}

/// Latest classified inventory snapshot per entity.
pub type SnapshotStore = LatestWinsStore<ClassifiedSnapshot>;

/// Latest accuracy record per (entity, model).
#[derive(Debug, Default)]
pub struct AccuracyStore {
    inner: RwLock<HashMap<EntityId, HashMap<String, AccuracyRecord>>>,
}

impl AccuracyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, record: AccuracyRecord) -> EngineResult<()> {
        self.inner
            .write()
            .map_err(|_| EngineError::store("lock poisoned"))?
            .entry(record.entity_id)
            .or_default()
            .insert(record.model_name.clone(), record);
        Ok(())
    }

    pub fn latest(
        &self,
        entity_id: EntityId,
        model_name: &str,
    ) -> EngineResult<Option<AccuracyRecord>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| EngineError::store("lock poisoned"))?
            .get(&entity_id)
            .and_then(|m| m.get(model_name))
            .cloned())
    }

    /// All per-model records for one entity (selection input).
    pub fn for_entity(&self, entity_id: EntityId) -> EngineResult<Vec<AccuracyRecord>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| EngineError::store("lock poisoned"))?
            .get(&entity_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcast_core::{Period, PeriodWindow};

    fn record(entity_id: EntityId, model: &str, mape: f64) -> AccuracyRecord {
        let start = Period::from_ymd(2025, 1, 1).unwrap();
        AccuracyRecord {
            entity_id,
            model_name: model.to_string(),
            evaluation_window: PeriodWindow::new(start, start.offset(7)),
            mape: Some(mape),
            rmse: 1.0,
            mae: 1.0,
            sample_count: 7,
        }
    }

    #[test]
    fn latest_wins_per_model() {
        let store = AccuracyStore::new();
        let e = EntityId::new();
        store.publish(record(e, "naive", 0.5)).unwrap();
        store.publish(record(e, "naive", 0.2)).unwrap();
        store.publish(record(e, "seasonal_trend", 0.1)).unwrap();

        assert_eq!(store.latest(e, "naive").unwrap().unwrap().mape, Some(0.2));
        assert_eq!(store.for_entity(e).unwrap().len(), 2);
    }

    #[test]
    fn missing_entity_reads_as_empty() {
        let store = AccuracyStore::new();
        let e = EntityId::new();
        assert!(store.for_entity(e).unwrap().is_empty());
        assert!(store.latest(e, "naive").unwrap().is_none());
    }
}
