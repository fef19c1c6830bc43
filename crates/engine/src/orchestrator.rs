//! The per-tick pipeline: ingest window → forecast → evaluate → detect →
//! classify → alert, for every tracked entity, on a bounded worker pool.

use std::collections::VecDeque;
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use stockcast_accuracy::{backtest, evaluate, rank_backends};
use stockcast_alerts::{AlertEngine, AlertKind, AlertSignal};
use stockcast_anomaly::detect;
use stockcast_core::{
    BackendChoice, EngineError, EngineResult, EntityConfig, EntityId, PeriodWindow,
};
use stockcast_forecast::{ModelBackend, forecast_seed, parse_model_name};
use stockcast_inventory::{InventorySnapshot, StockThresholds, classify, suggested_action};
use stockcast_timeseries::{StoreError, TimeSeries, TimeSeriesStore};

use crate::config::ConfigRegistry;
use crate::feed::InventoryFeed;
use crate::stores::{AccuracyStore, ClassifiedSnapshot, ForecastStore, SnapshotStore};

/// Scheduling knobs for one tick.
#[derive(Debug, Clone)]
pub struct TickOptions {
    /// Worker pool size; entities are the unit of parallelism.
    pub max_concurrent: usize,
    /// Entities not started by the deadline are deferred to the next tick.
    pub deadline: Duration,
    /// Bounded retry budget for store I/O.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for TickOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            deadline: Duration::from_secs(30),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl TickOptions {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Outcome of one pipeline sub-step for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotRun,
    Completed,
    /// The sub-step did not apply this cycle (e.g. insufficient history);
    /// not a failure of the entity pipeline.
    Skipped(String),
    Failed(String),
}

impl StepStatus {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}

/// Per-entity status for one tick, one field per sub-step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTickReport {
    pub entity_id: EntityId,
    pub forecast: StepStatus,
    pub evaluation: StepStatus,
    pub anomaly: StepStatus,
    pub inventory: StepStatus,
    pub alerts: StepStatus,
}

impl EntityTickReport {
    fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            forecast: StepStatus::NotRun,
            evaluation: StepStatus::NotRun,
            anomaly: StepStatus::NotRun,
            inventory: StepStatus::NotRun,
            alerts: StepStatus::NotRun,
        }
    }

    fn all_failed(entity_id: EntityId, reason: &str) -> Self {
        Self {
            entity_id,
            forecast: StepStatus::failed(reason),
            evaluation: StepStatus::failed(reason),
            anomaly: StepStatus::failed(reason),
            inventory: StepStatus::failed(reason),
            alerts: StepStatus::failed(reason),
        }
    }
}

/// Outcome of one scheduling tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub completed: Vec<EntityTickReport>,
    /// Entities not started before the deadline; they run next tick.
    pub deferred: Vec<EntityId>,
}

/// Drives the pipeline across all tracked entities.
///
/// Each entity's pipeline runs to completion on one worker with no
/// cross-entity shared mutable state; the observation and alert stores are
/// the only shared resources and serialize per entity/key internally.
pub struct Orchestrator<S, F> {
    store: S,
    feed: F,
    configs: ConfigRegistry,
    forecasts: ForecastStore,
    accuracy: AccuracyStore,
    snapshots: SnapshotStore,
    alerts: AlertEngine,
    options: TickOptions,
}

impl<S, F> Orchestrator<S, F>
where
    S: TimeSeriesStore,
    F: InventoryFeed,
{
    pub fn new(store: S, feed: F) -> Self {
        Self {
            store,
            feed,
            configs: ConfigRegistry::default(),
            forecasts: ForecastStore::new(),
            accuracy: AccuracyStore::new(),
            snapshots: SnapshotStore::new(),
            alerts: AlertEngine::new(),
            options: TickOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TickOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_configs(mut self, configs: ConfigRegistry) -> Self {
        self.configs = configs;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn configs(&self) -> &ConfigRegistry {
        &self.configs
    }

    pub fn forecasts(&self) -> &ForecastStore {
        &self.forecasts
    }

    pub fn accuracy(&self) -> &AccuracyStore {
        &self.accuracy
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn alerts(&self) -> &AlertEngine {
        &self.alerts
    }

    /// Run one scheduling tick over every tracked entity.
    ///
    /// Workers pull entity ids off a shared queue until it drains or the
    /// deadline passes; a claimed entity always runs to completion (no
    /// mid-write cancellation). Re-running a tick on unchanged data is a
    /// no-op: forecasts compare basis periods and alerts deduplicate.
    pub fn run_tick(&self) -> TickReport {
        let started_at = Utc::now();

        let entity_ids = match self.with_retries("list entities", || self.store.entities()) {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to list entities; tick aborted");
                return TickReport {
                    started_at,
                    completed: Vec::new(),
                    deferred: Vec::new(),
                };
            }
        };
        let total = entity_ids.len();

        let queue = Mutex::new(VecDeque::from(entity_ids));
        let deadline = Instant::now() + self.options.deadline;
        let workers = self.options.max_concurrent.max(1);
        let (tx, rx) = mpsc::channel::<EntityTickReport>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    loop {
                        if Instant::now() >= deadline {
                            break;
                        }
                        let Some(entity_id) =
                            queue.lock().ok().and_then(|mut q| q.pop_front())
                        else {
                            break;
                        };
                        let report = self.process_entity(entity_id, Utc::now());
                        if tx.send(report).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);
        });

        let completed: Vec<EntityTickReport> = rx.into_iter().collect();
        let deferred: Vec<EntityId> = queue
            .into_inner()
            .map(|q| q.into_iter().collect())
            .unwrap_or_default();

        info!(
            entities = total,
            completed = completed.len(),
            deferred = deferred.len(),
            "tick complete"
        );

        TickReport {
            started_at,
            completed,
            deferred,
        }
    }

    /// One entity's pipeline. Errors are recorded per sub-step and never
    /// propagate; stale-but-valid published state beats inconsistent state.
    pub fn process_entity(&self, entity_id: EntityId, now: DateTime<Utc>) -> EntityTickReport {
        let cfg = self.configs.config_for(entity_id);
        let mut report = EntityTickReport::new(entity_id);

        let series = match self.with_retries("read series", || self.store.series(entity_id)) {
            Ok(s) => s,
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "series read failed; previous published state left intact");
                return EntityTickReport::all_failed(entity_id, &e.to_string());
            }
        };

        let mut signals: Vec<AlertSignal> = Vec::new();
        let mut resolvable: Vec<AlertKind> = Vec::new();

        // Prior forecasts are scored before a new one supersedes them.
        report.evaluation =
            self.evaluate_step(entity_id, &series, &cfg, &mut signals, &mut resolvable);
        report.forecast = self.forecast_step(entity_id, &series, &cfg);
        report.anomaly = self.anomaly_step(entity_id, &series, &cfg, &mut signals, &mut resolvable);
        report.inventory =
            self.inventory_step(entity_id, &cfg, &mut signals, &mut resolvable, now);

        report.alerts = match self.alerts.observe_scoped(entity_id, &signals, &resolvable, now) {
            Ok(outcome) => {
                debug!(
                    entity = %entity_id,
                    opened = outcome.opened.len(),
                    updated = outcome.updated.len(),
                    resolved = outcome.resolved.len(),
                    "alerts observed"
                );
                StepStatus::Completed
            }
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "alert observation failed");
                StepStatus::failed(e)
            }
        };

        report
    }

    /// Backtest every backend against the entity's recent history.
    pub fn compare_backends(
        &self,
        entity_id: EntityId,
    ) -> EngineResult<Vec<stockcast_accuracy::AccuracyRecord>> {
        let cfg = self.configs.config_for(entity_id);
        let series = self
            .with_retries("read series", || self.store.series(entity_id))
            .map_err(EngineError::from)?;
        let sp = cfg.seasonal_period;
        let backends = [
            ModelBackend::Naive,
            ModelBackend::SeasonalTrend { seasonal_period: sp },
            ModelBackend::RegressionEnsemble { seasonal_period: sp },
        ];
        let holdout = cfg.horizon.min(series.latest().len() / 4).max(1);
        Ok(backtest(
            entity_id,
            &series,
            &backends,
            holdout,
            cfg.confidence_level,
        ))
    }

    fn evaluate_step(
        &self,
        entity_id: EntityId,
        series: &TimeSeries,
        cfg: &EntityConfig,
        signals: &mut Vec<AlertSignal>,
        resolvable: &mut Vec<AlertKind>,
    ) -> StepStatus {
        let prior = match self.forecasts.latest(entity_id) {
            Ok(Some(f)) => f,
            Ok(None) => return StepStatus::skipped("no prior forecast"),
            Err(e) => return StepStatus::failed(e),
        };
        let Some(last) = series.last_period() else {
            return StepStatus::skipped("empty series");
        };
        let Some(first_point) = prior.points.first() else {
            return StepStatus::skipped("prior forecast has no points");
        };
        let window = PeriodWindow::new(first_point.period, last.next());
        if window.is_empty() {
            return StepStatus::skipped("no forecast period has elapsed yet");
        }

        let actuals = series.latest();
        match evaluate(
            entity_id,
            &prior.model_name,
            std::slice::from_ref(&prior),
            &actuals,
            window,
        ) {
            Ok(record) => {
                resolvable.push(AlertKind::ForecastDegraded);
                if let Some(mape) = record.mape {
                    if mape > cfg.accuracy_floor_mape {
                        signals.push(AlertSignal::new(
                            entity_id,
                            AlertKind::ForecastDegraded,
                            format!(
                                "model '{}' MAPE {:.1}% is above the {:.1}% floor over {} periods",
                                record.model_name,
                                mape * 100.0,
                                cfg.accuracy_floor_mape * 100.0,
                                record.sample_count
                            ),
                        ));
                    }
                }
                if let Err(e) = self.accuracy.publish(record) {
                    return StepStatus::failed(e);
                }
                StepStatus::Completed
            }
            Err(EngineError::NoMatchingObservations) => {
                StepStatus::skipped("no realized observations joined the prior forecast")
            }
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "forecast evaluation failed");
                StepStatus::failed(e)
            }
        }
    }

    fn forecast_step(
        &self,
        entity_id: EntityId,
        series: &TimeSeries,
        cfg: &EntityConfig,
    ) -> StepStatus {
        let Some(basis) = series.last_period() else {
            return StepStatus::skipped("no observations");
        };
        let backend = self.select_backend(entity_id, cfg);

        // Idempotence: an unchanged series re-forecast by the same model
        // would reproduce the published result; skip the work.
        match self.forecasts.latest(entity_id) {
            Ok(Some(prior))
                if prior.basis_period == basis && prior.model_name == backend.model_name() =>
            {
                return StepStatus::skipped("basis period unchanged since last forecast");
            }
            Ok(_) => {}
            Err(e) => return StepStatus::failed(e),
        }

        let seed = forecast_seed(entity_id, cfg.horizon);
        match backend.fit_and_forecast(series, cfg.horizon, cfg.confidence_level, seed) {
            Ok(result) => {
                debug!(
                    entity = %entity_id,
                    model = result.model_name,
                    horizon = result.horizon_periods,
                    "forecast published"
                );
                match self.forecasts.publish(entity_id, result) {
                    Ok(()) => StepStatus::Completed,
                    Err(e) => StepStatus::failed(e),
                }
            }
            Err(EngineError::InsufficientHistory {
                required,
                available,
            }) => StepStatus::skipped(format!(
                "insufficient history for {}: need {required}, have {available}",
                backend.model_name()
            )),
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "forecast failed");
                StepStatus::failed(e)
            }
        }
    }

    fn anomaly_step(
        &self,
        entity_id: EntityId,
        series: &TimeSeries,
        cfg: &EntityConfig,
        signals: &mut Vec<AlertSignal>,
        resolvable: &mut Vec<AlertKind>,
    ) -> StepStatus {
        match detect(series, cfg.anomaly_lookback, cfg.anomaly_k) {
            Ok(anomalies) => {
                resolvable.extend([
                    AlertKind::DemandSpike,
                    AlertKind::DemandDrop,
                    AlertKind::Stockout,
                ]);
                // Only the live edge of the series signals; an anomaly in
                // an older period has either alerted already or passed.
                let Some(last) = series.last_period() else {
                    return StepStatus::Completed;
                };
                for anomaly in anomalies.iter().filter(|a| a.period == last) {
                    signals.push(AlertSignal::new(
                        entity_id,
                        AlertKind::from_anomaly(anomaly.kind),
                        format!(
                            "{:?} in period {}: magnitude {:.2}",
                            anomaly.kind, anomaly.period, anomaly.magnitude
                        ),
                    ));
                }
                StepStatus::Completed
            }
            Err(EngineError::InsufficientHistory {
                required,
                available,
            }) => StepStatus::skipped(format!(
                "anomaly baseline needs {required} periods, have {available}"
            )),
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "anomaly detection failed");
                StepStatus::failed(e)
            }
        }
    }

    fn inventory_step(
        &self,
        entity_id: EntityId,
        cfg: &EntityConfig,
        signals: &mut Vec<AlertSignal>,
        resolvable: &mut Vec<AlertKind>,
        now: DateTime<Utc>,
    ) -> StepStatus {
        let levels = match self.feed.current_inventory(entity_id) {
            Ok(l) => l,
            Err(e) => {
                warn!(entity = %entity_id, error = %e, "inventory feed failed; previous snapshot left intact");
                return StepStatus::failed(e);
            }
        };

        let mut snapshot = InventorySnapshot::new(
            entity_id,
            levels.current_stock,
            levels.avg_daily_consumption,
            levels.reorder_point,
        );
        snapshot.observed_at = now;

        let thresholds = StockThresholds::from(cfg);
        let status = classify(&snapshot, &thresholds);
        let action = suggested_action(status, &snapshot);

        resolvable.extend([
            AlertKind::Stockout,
            AlertKind::LowStock,
            AlertKind::Overstock,
        ]);
        if let Some(kind) = AlertKind::from_stock_status(status) {
            let cover = snapshot
                .days_of_stock
                .map(|d| format!("{d:.0} days of stock"))
                .unwrap_or_else(|| "no consumption".to_string());
            signals.push(AlertSignal::new(
                entity_id,
                kind,
                format!("{status:?}: {cover}; {action}"),
            ));
        }

        match self.snapshots.publish(
            entity_id,
            ClassifiedSnapshot {
                snapshot,
                status,
                suggested_action: action,
            },
        ) {
            Ok(()) => StepStatus::Completed,
            Err(e) => StepStatus::failed(e),
        }
    }

    fn select_backend(&self, entity_id: EntityId, cfg: &EntityConfig) -> ModelBackend {
        let fallback = ModelBackend::SeasonalTrend {
            seasonal_period: cfg.seasonal_period,
        };
        match &cfg.backend {
            BackendChoice::Fixed(name) => match parse_model_name(name, cfg.seasonal_period) {
                Ok(backend) => backend,
                Err(e) => {
                    warn!(entity = %entity_id, error = %e, "configured backend invalid, using default");
                    fallback
                }
            },
            BackendChoice::Auto => {
                let records = self.accuracy.for_entity(entity_id).unwrap_or_default();
                rank_backends(&records)
                    .first()
                    .and_then(|name| parse_model_name(name, cfg.seasonal_period).ok())
                    .unwrap_or(fallback)
            }
        }
    }

    fn with_retries<T>(
        &self,
        op: &str,
        mut f: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt: u32 = 0;
        loop {
            match f() {
                Ok(v) => return Ok(v),
                // Only I/O failures are transient; ordering errors are
                // deterministic and retrying them cannot succeed.
                Err(StoreError::Io(msg)) if attempt < self.options.max_retries => {
                    attempt += 1;
                    warn!(op, attempt, error = %msg, "store operation failed, backing off");
                    thread::sleep(backoff(self.options.base_backoff, attempt));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff: base * 2^(attempt-1), capped.
fn backoff(base: Duration, attempt: u32) -> Duration {
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}
