//! The ingestion/query facade over the orchestrator.
//!
//! Callers submit observations and read published results here; ticks
//! recompute everything downstream of the observation log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use stockcast_accuracy::{AccuracyRecord, evaluate};
use stockcast_alerts::{Alert, AlertFilter};
use stockcast_core::{EngineError, EngineResult, EntityConfig, EntityId, Period, PeriodWindow};
use stockcast_forecast::ForecastResult;
use stockcast_inventory::StockStatus;
use stockcast_timeseries::{Observation, TimeSeriesStore};

use crate::feed::InventoryFeed;
use crate::orchestrator::{Orchestrator, TickReport};

/// Read model for one entity's current stock posture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryStatusView {
    pub entity_id: EntityId,
    pub status: StockStatus,
    pub current_stock: f64,
    pub days_of_stock: Option<f64>,
    pub suggested_action: String,
    pub observed_at: DateTime<Utc>,
}

/// Thin facade binding ingestion, queries, and tick scheduling together.
pub struct EngineService<S, F> {
    orchestrator: Orchestrator<S, F>,
}

impl<S, F> EngineService<S, F>
where
    S: TimeSeriesStore,
    F: InventoryFeed,
{
    pub fn new(orchestrator: Orchestrator<S, F>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator<S, F> {
        &self.orchestrator
    }

    /// Append a closed-period observation to the entity's log.
    pub fn submit_observation(
        &self,
        entity_id: EntityId,
        period: Period,
        value: f64,
    ) -> EngineResult<()> {
        self.orchestrator
            .store()
            .append(Observation::new(entity_id, period, value))?;
        info!(entity = %entity_id, %period, value, "observation accepted");
        Ok(())
    }

    /// Append a correction for a recent period. The revision number must
    /// follow the period's current one; stale corrections are rejected.
    pub fn submit_revision(
        &self,
        entity_id: EntityId,
        period: Period,
        value: f64,
        revision: u32,
    ) -> EngineResult<()> {
        self.orchestrator
            .store()
            .append(Observation::new(entity_id, period, value).revised(revision))?;
        info!(entity = %entity_id, %period, value, revision, "revision accepted");
        Ok(())
    }

    /// Latest published forecast, if one exists.
    pub fn get_forecast(&self, entity_id: EntityId) -> EngineResult<Option<ForecastResult>> {
        self.orchestrator.forecasts().latest(entity_id)
    }

    /// Score the latest published forecast against realized observations
    /// inside `window`, on demand.
    pub fn get_accuracy(
        &self,
        entity_id: EntityId,
        window: PeriodWindow,
    ) -> EngineResult<AccuracyRecord> {
        let Some(forecast) = self.orchestrator.forecasts().latest(entity_id)? else {
            return Err(EngineError::NoMatchingObservations);
        };
        let actuals = self.orchestrator.store().read(entity_id, window)?;
        evaluate(
            entity_id,
            &forecast.model_name,
            std::slice::from_ref(&forecast),
            &actuals,
            window,
        )
    }

    /// Latest tick-published accuracy record per model for the entity.
    pub fn list_accuracy(&self, entity_id: EntityId) -> EngineResult<Vec<AccuracyRecord>> {
        self.orchestrator.accuracy().for_entity(entity_id)
    }

    pub fn list_alerts(&self, filter: &AlertFilter) -> EngineResult<Vec<Alert>> {
        self.orchestrator
            .alerts()
            .list(filter)
            .map_err(|e| EngineError::store(e.to_string()))
    }

    /// Classified stock posture from the latest tick, if one ran.
    pub fn get_inventory_status(
        &self,
        entity_id: EntityId,
    ) -> EngineResult<Option<InventoryStatusView>> {
        let Some(classified) = self.orchestrator.snapshots().latest(entity_id)? else {
            return Ok(None);
        };
        Ok(Some(InventoryStatusView {
            entity_id,
            status: classified.status,
            current_stock: classified.snapshot.current_stock,
            days_of_stock: classified.snapshot.days_of_stock,
            suggested_action: classified.suggested_action,
            observed_at: classified.snapshot.observed_at,
        }))
    }

    /// Score all backends against the entity's recent history.
    pub fn compare_backends(&self, entity_id: EntityId) -> EngineResult<Vec<AccuracyRecord>> {
        self.orchestrator.compare_backends(entity_id)
    }

    pub fn set_config(&self, entity_id: EntityId, config: EntityConfig) -> EngineResult<()> {
        self.orchestrator.configs().set(entity_id, config)
    }

    pub fn run_tick(&self) -> TickReport {
        self.orchestrator.run_tick()
    }
}
