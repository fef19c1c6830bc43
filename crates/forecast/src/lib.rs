//! Model backends: turn a time series into a point-and-interval forecast.
//!
//! Backends form a closed set behind one fit/forecast contract, so a new
//! backend can be added without touching the orchestrator. Backends are
//! stateless across calls: identical series, horizon, confidence and seed
//! produce identical output.

pub mod backend;
pub mod result;
pub mod stats;

pub use backend::{ModelBackend, forecast_seed, parse_model_name};
pub use result::{ForecastPoint, ForecastResult};
