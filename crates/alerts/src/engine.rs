use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockcast_core::{AlertId, EntityId};

use crate::alert::{Alert, AlertKind, DedupeKey, Severity, severity_for};

/// One qualifying condition observed during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSignal {
    pub entity_id: EntityId,
    pub kind: AlertKind,
    pub message: String,
    pub observed_at: DateTime<Utc>,
}

impl AlertSignal {
    pub fn new(entity_id: EntityId, kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            entity_id,
            kind,
            message: message.into(),
            observed_at: Utc::now(),
        }
    }

    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::new(self.entity_id, self.kind)
    }
}

#[derive(Debug, Error)]
pub enum AlertStoreError {
    #[error("alert storage failure: {0}")]
    Io(String),
}

/// What one `observe` call did, for logging and idempotence checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObserveOutcome {
    pub opened: Vec<AlertId>,
    pub updated: Vec<AlertId>,
    pub resolved: Vec<AlertId>,
}

/// Query filter for `list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub kind: Option<AlertKind>,
    pub open_only: bool,
}

impl AlertFilter {
    /// Only currently-open alerts, any kind or severity.
    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Self::default()
        }
    }
}

/// Dedupe-keyed alert store and state machine.
///
/// Per key: absent → open → open(updated) → resolved. The engine is the
/// only writer; the keyed map gives per-key serialization while different
/// keys proceed concurrently through the shared lock. Full history is
/// retained per key for audit.
#[derive(Debug, Default)]
pub struct AlertEngine {
    lifecycles: RwLock<HashMap<DedupeKey, Vec<Alert>>>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one entity's signals for a tick.
    ///
    /// - A signal with no open alert for its key opens one.
    /// - A signal for an already-open alert updates message/severity/
    ///   triggered_at in place; it never creates a second alert.
    /// - An open alert for the entity whose condition was not signalled
    ///   this tick is resolved, stamped once, and immutable after.
    pub fn observe(
        &self,
        entity_id: EntityId,
        signals: &[AlertSignal],
        now: DateTime<Utc>,
    ) -> Result<ObserveOutcome, AlertStoreError> {
        self.observe_scoped(entity_id, signals, &AlertKind::ALL, now)
    }

    /// Like `observe`, but absence only resolves alerts whose kind is in
    /// `resolvable`. The orchestrator scopes resolution to the sub-steps
    /// that actually ran this tick — a skipped anomaly check must not
    /// clear an open demand-spike alert.
    pub fn observe_scoped(
        &self,
        entity_id: EntityId,
        signals: &[AlertSignal],
        resolvable: &[AlertKind],
        now: DateTime<Utc>,
    ) -> Result<ObserveOutcome, AlertStoreError> {
        let mut lifecycles = self
            .lifecycles
            .write()
            .map_err(|_| AlertStoreError::Io("lock poisoned".to_string()))?;

        let mut outcome = ObserveOutcome::default();

        for signal in signals {
            debug_assert_eq!(signal.entity_id, entity_id);
            let key = signal.dedupe_key();
            let history = lifecycles.entry(key).or_default();

            match history.last_mut() {
                Some(open) if open.is_open() => {
                    open.message = signal.message.clone();
                    open.severity = severity_for(signal.kind);
                    open.triggered_at = now;
                    outcome.updated.push(open.alert_id);
                }
                _ => {
                    let alert = Alert {
                        alert_id: AlertId::new(),
                        entity_id,
                        kind: signal.kind,
                        severity: severity_for(signal.kind),
                        message: signal.message.clone(),
                        triggered_at: now,
                        resolved_at: None,
                        dedupe_key: key,
                    };
                    outcome.opened.push(alert.alert_id);
                    history.push(alert);
                }
            }
        }

        // Absence of the condition resolves the open alert.
        let signalled: Vec<DedupeKey> = signals.iter().map(|s| s.dedupe_key()).collect();
        for (key, history) in lifecycles.iter_mut() {
            if key.entity_id != entity_id
                || signalled.contains(key)
                || !resolvable.contains(&key.kind)
            {
                continue;
            }
            if let Some(open) = history.last_mut() {
                if open.is_open() {
                    open.resolved_at = Some(now);
                    outcome.resolved.push(open.alert_id);
                }
            }
        }

        Ok(outcome)
    }

    /// The currently open alert for a key, if any.
    pub fn open_alert(&self, key: DedupeKey) -> Result<Option<Alert>, AlertStoreError> {
        let lifecycles = self
            .lifecycles
            .read()
            .map_err(|_| AlertStoreError::Io("lock poisoned".to_string()))?;
        Ok(lifecycles
            .get(&key)
            .and_then(|h| h.last())
            .filter(|a| a.is_open())
            .cloned())
    }

    /// Full audit history for a key, oldest lifecycle first.
    pub fn history(&self, key: DedupeKey) -> Result<Vec<Alert>, AlertStoreError> {
        let lifecycles = self
            .lifecycles
            .read()
            .map_err(|_| AlertStoreError::Io("lock poisoned".to_string()))?;
        Ok(lifecycles.get(&key).cloned().unwrap_or_default())
    }

    /// Filtered alert stream, newest trigger first.
    pub fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, AlertStoreError> {
        let lifecycles = self
            .lifecycles
            .read()
            .map_err(|_| AlertStoreError::Io("lock poisoned".to_string()))?;

        let mut alerts: Vec<Alert> = lifecycles
            .values()
            .flatten()
            .filter(|a| !filter.open_only || a.is_open())
            .filter(|a| filter.severity.is_none_or(|s| a.severity == s))
            .filter(|a| filter.kind.is_none_or(|k| a.kind == k))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at).then(a.dedupe_key.cmp(&b.dedupe_key)));
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn low_stock(entity: EntityId, message: &str) -> AlertSignal {
        AlertSignal::new(entity, AlertKind::LowStock, message)
    }

    #[test]
    fn first_signal_opens_one_alert() {
        let engine = AlertEngine::new();
        let e = EntityId::new();
        let now = Utc::now();

        let outcome = engine.observe(e, &[low_stock(e, "7 days left")], now).unwrap();
        assert_eq!(outcome.opened.len(), 1);
        assert!(outcome.updated.is_empty());

        let open = engine
            .open_alert(DedupeKey::new(e, AlertKind::LowStock))
            .unwrap()
            .unwrap();
        assert_eq!(open.severity, Severity::High);
        assert_eq!(open.message, "7 days left");
    }

    #[test]
    fn sustained_condition_updates_the_same_alert() {
        let engine = AlertEngine::new();
        let e = EntityId::new();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(1);

        let first = engine.observe(e, &[low_stock(e, "7 days left")], t1).unwrap();
        let second = engine.observe(e, &[low_stock(e, "5 days left")], t2).unwrap();

        assert_eq!(second.updated, first.opened);
        assert!(second.opened.is_empty());

        let open = engine
            .open_alert(DedupeKey::new(e, AlertKind::LowStock))
            .unwrap()
            .unwrap();
        assert_eq!(open.message, "5 days left");
        assert_eq!(open.triggered_at, t2);

        let all = engine.list(&AlertFilter::default()).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn absence_resolves_and_recurrence_opens_a_new_id() {
        let engine = AlertEngine::new();
        let e = EntityId::new();
        let key = DedupeKey::new(e, AlertKind::LowStock);
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(1);
        let t3 = t1 + chrono::Duration::hours(2);

        let opened = engine.observe(e, &[low_stock(e, "low")], t1).unwrap();
        let resolved = engine.observe(e, &[], t2).unwrap();
        assert_eq!(resolved.resolved, opened.opened);
        assert!(engine.open_alert(key).unwrap().is_none());

        // Re-running with no condition is a no-op (one resolved stamp).
        let noop = engine.observe(e, &[], t3).unwrap();
        assert_eq!(noop, ObserveOutcome::default());

        let reopened = engine.observe(e, &[low_stock(e, "low again")], t3).unwrap();
        assert_eq!(reopened.opened.len(), 1);
        assert_ne!(reopened.opened[0], opened.opened[0]);

        let history = engine.history(key).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].resolved_at, Some(t2));
        assert!(history[1].is_open());
    }

    #[test]
    fn scoped_observe_leaves_out_of_scope_kinds_open() {
        let engine = AlertEngine::new();
        let e = EntityId::new();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(1);

        engine
            .observe(e, &[AlertSignal::new(e, AlertKind::DemandSpike, "spike")], t1)
            .unwrap();

        // Anomaly step skipped this tick: spike is not resolvable.
        let outcome = engine
            .observe_scoped(e, &[], &[AlertKind::LowStock], t2)
            .unwrap();
        assert!(outcome.resolved.is_empty());
        assert!(
            engine
                .open_alert(DedupeKey::new(e, AlertKind::DemandSpike))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn signals_for_one_entity_do_not_resolve_another() {
        let engine = AlertEngine::new();
        let (a, b) = (EntityId::new(), EntityId::new());
        let now = Utc::now();

        engine.observe(a, &[low_stock(a, "low")], now).unwrap();
        engine.observe(b, &[], now).unwrap();

        assert!(
            engine
                .open_alert(DedupeKey::new(a, AlertKind::LowStock))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn list_filters_by_severity_kind_and_openness() {
        let engine = AlertEngine::new();
        let e = EntityId::new();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(1);

        let signals = vec![
            AlertSignal::new(e, AlertKind::Stockout, "out"),
            AlertSignal::new(e, AlertKind::Overstock, "140 days of cover"),
        ];
        engine.observe(e, &signals, t1).unwrap();
        // Overstock clears; stockout persists.
        engine
            .observe(e, &[AlertSignal::new(e, AlertKind::Stockout, "still out")], t2)
            .unwrap();

        let critical = engine
            .list(&AlertFilter {
                severity: Some(Severity::Critical),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].kind, AlertKind::Stockout);

        let open = engine
            .list(&AlertFilter {
                open_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(open.len(), 1);

        let overstock = engine
            .list(&AlertFilter {
                kind: Some(AlertKind::Overstock),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(overstock.len(), 1);
        assert_eq!(overstock[0].resolved_at, Some(t2));
    }
}
