//! `stockcast-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the period calendar, the engine error taxonomy, and
//! per-entity configuration.

pub mod config;
pub mod error;
pub mod id;
pub mod period;

pub use config::{BackendChoice, EntityConfig};
pub use error::{EngineError, EngineResult};
pub use id::{AlertId, EntityId};
pub use period::{Period, PeriodWindow};
