//! Inventory state classification.
//!
//! This crate contains the business rules for stock status, implemented
//! purely as deterministic domain logic (no IO, no storage, no hidden
//! state).

pub mod snapshot;

pub use snapshot::{InventorySnapshot, StockStatus, StockThresholds, classify, suggested_action};
