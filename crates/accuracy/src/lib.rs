//! Forecast accuracy: compare past forecasts to realized observations,
//! compute MAPE/RMSE/MAE, and rank backends.
//!
//! Evaluation is pure — persistence of the resulting record is the
//! orchestrator's responsibility.

pub mod evaluate;
pub mod ranking;

pub use evaluate::{AccuracyRecord, backtest, evaluate};
pub use ranking::rank_backends;
