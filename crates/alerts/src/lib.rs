//! Alerting: qualifying signals become deduplicated, severity-ranked,
//! lifecycle-managed alerts.
//!
//! One open alert per dedupe key at any time; recurring conditions update
//! the open alert in place, clearing conditions resolve it, and a later
//! recurrence opens a fresh alert id under the same key.

pub mod alert;
pub mod engine;

pub use alert::{Alert, AlertKind, DedupeKey, Severity, severity_for};
pub use engine::{AlertEngine, AlertFilter, AlertSignal, AlertStoreError, ObserveOutcome};
