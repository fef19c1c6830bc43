//! Engine error taxonomy.

use thiserror::Error;

use crate::period::Period;

/// Result type used across the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Keep this focused on deterministic, per-entity failures (ordering,
/// history, configuration). Errors here are scoped to one entity/sub-step
/// and are caught and logged by the orchestrator; they never abort a tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// An observation arrived for a period older than the revision window.
    #[error("out-of-order period: attempted {attempted}, series is at {last}")]
    OutOfOrderPeriod { last: Period, attempted: Period },

    /// A series is too short for the requested computation.
    #[error("insufficient history: required {required}, available {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// No forecast point joined to a realized observation in the window.
    ///
    /// Callers must not report a spuriously perfect accuracy in this case.
    #[error("no matching observations in evaluation window")]
    NoMatchingObservations,

    /// Invalid thresholds, confidence level or model name.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Store-level I/O failure surfaced through a store trait.
    #[error("store error: {0}")]
    Store(String),
}

impl EngineError {
    pub fn out_of_order(last: Period, attempted: Period) -> Self {
        Self::OutOfOrderPeriod { last, attempted }
    }

    pub fn insufficient_history(required: usize, available: usize) -> Self {
        Self::InsufficientHistory {
            required,
            available,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
