//! Inventory feed: the external collaborator that knows current stock
//! levels. The engine consumes it behind a storage-agnostic trait, the
//! same seam the analysis stores use.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockcast_core::EntityId;

/// Raw levels reported by the collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevels {
    pub current_stock: f64,
    pub avg_daily_consumption: f64,
    pub reorder_point: f64,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no inventory data for entity {0}")]
    Missing(EntityId),

    #[error("inventory feed unavailable: {0}")]
    Unavailable(String),
}

pub trait InventoryFeed: Send + Sync {
    fn current_inventory(&self, entity_id: EntityId) -> Result<InventoryLevels, FeedError>;
}

/// In-memory feed for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInventoryFeed {
    levels: RwLock<HashMap<EntityId, InventoryLevels>>,
}

impl InMemoryInventoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, entity_id: EntityId, levels: InventoryLevels) {
        if let Ok(mut map) = self.levels.write() {
            map.insert(entity_id, levels);
        }
    }
}

impl InventoryFeed for InMemoryInventoryFeed {
    fn current_inventory(&self, entity_id: EntityId) -> Result<InventoryLevels, FeedError> {
        self.levels
            .read()
            .map_err(|_| FeedError::Unavailable("lock poisoned".to_string()))?
            .get(&entity_id)
            .copied()
            .ok_or(FeedError::Missing(entity_id))
    }
}
