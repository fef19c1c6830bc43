//! Orchestration: the per-tick pipeline across all tracked entities.
//!
//! The orchestrator is the only component aware of all entities; every
//! other crate operates on one entity's series at a time. Entities are the
//! unit of parallelism and of failure isolation — one entity's error is
//! logged and recorded, never propagated to abort the tick.

pub mod config;
pub mod feed;
pub mod orchestrator;
pub mod service;
pub mod stores;


pub use config::ConfigRegistry;
pub use feed::{FeedError, InMemoryInventoryFeed, InventoryFeed, InventoryLevels};
pub use orchestrator::{
    EntityTickReport, Orchestrator, StepStatus, TickOptions, TickReport,
};
pub use service::{EngineService, InventoryStatusView};
pub use stores::{AccuracyStore, ClassifiedSnapshot, ForecastStore, SnapshotStore};
