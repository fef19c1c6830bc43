//! Time series substrate: append-only, per-entity ordered observation logs.
//!
//! The store is the factual substrate of the engine. Observations are never
//! mutated after their period closes; late corrections append a new revision.
//! No implicit aggregation happens here — resampling is a pure caller-side
//! function.

pub mod observation;
pub mod resample;
pub mod store;

pub use observation::{Observation, TimeSeries};
pub use resample::resample_monthly;
pub use store::{InMemoryTimeSeriesStore, StoreError, TimeSeriesStore};
