//! Tracing/logging setup shared by the engine binary and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{init, init_with_default};
