//! Demo binary: seeds a few entities with synthetic demand, runs one tick,
//! and prints the report and any open alerts as JSON.

use anyhow::Context;

use stockcast_alerts::AlertFilter;
use stockcast_core::{EntityId, Period};
use stockcast_engine::{
    EngineService, InMemoryInventoryFeed, InventoryLevels, Orchestrator,
};
use stockcast_timeseries::InMemoryTimeSeriesStore;

fn main() -> anyhow::Result<()> {
    stockcast_observability::init();

    let service = EngineService::new(Orchestrator::new(
        InMemoryTimeSeriesStore::new(),
        InMemoryInventoryFeed::new(),
    ));

    let start = Period::from_ymd(2026, 1, 1).context("invalid seed date")?;

    // Steady mover, comfortably stocked.
    let steady = EntityId::new();
    for i in 0..90 {
        let demand = 120.0 + 15.0 * ((i % 7) as f64);
        service.submit_observation(steady, start.offset(i), demand)?;
    }
    service.orchestrator().feed().set(
        steady,
        InventoryLevels {
            current_stock: 5_000.0,
            avg_daily_consumption: 128.0,
            reorder_point: 900.0,
        },
    );

    // Fast mover about to run dry.
    let dwindling = EntityId::new();
    for i in 0..90 {
        service.submit_observation(dwindling, start.offset(i), 520.0)?;
    }
    service.orchestrator().feed().set(
        dwindling,
        InventoryLevels {
            current_stock: 1_040.0,
            avg_daily_consumption: 520.0,
            reorder_point: 3_640.0,
        },
    );

    let report = service.run_tick();
    println!("{}", serde_json::to_string_pretty(&report)?);

    let open = service.list_alerts(&AlertFilter::open())?;
    println!("{}", serde_json::to_string_pretty(&open)?);

    Ok(())
}
