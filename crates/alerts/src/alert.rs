use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcast_core::{AlertId, EntityId};
use stockcast_anomaly::AnomalyKind;
use stockcast_inventory::StockStatus;

/// The conditions the engine alerts on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Stockout,
    LowStock,
    Overstock,
    DemandSpike,
    DemandDrop,
    ForecastDegraded,
}

impl AlertKind {
    pub const ALL: [AlertKind; 6] = [
        AlertKind::Stockout,
        AlertKind::LowStock,
        AlertKind::Overstock,
        AlertKind::DemandSpike,
        AlertKind::DemandDrop,
        AlertKind::ForecastDegraded,
    ];

    /// The alert kind for an inventory status, if it qualifies.
    pub fn from_stock_status(status: StockStatus) -> Option<Self> {
        match status {
            StockStatus::Out => Some(AlertKind::Stockout),
            StockStatus::Low => Some(AlertKind::LowStock),
            StockStatus::Overstock => Some(AlertKind::Overstock),
            StockStatus::Normal => None,
        }
    }

    pub fn from_anomaly(kind: AnomalyKind) -> Self {
        match kind {
            AnomalyKind::Spike => AlertKind::DemandSpike,
            AnomalyKind::Drop => AlertKind::DemandDrop,
            AnomalyKind::Stockout => AlertKind::Stockout,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Fixed severity table. The engine never infers severity beyond this.
pub fn severity_for(kind: AlertKind) -> Severity {
    match kind {
        AlertKind::Stockout => Severity::Critical,
        AlertKind::LowStock => Severity::High,
        AlertKind::DemandSpike => Severity::Medium,
        AlertKind::DemandDrop => Severity::Medium,
        AlertKind::ForecastDegraded => Severity::Medium,
        AlertKind::Overstock => Severity::Low,
    }
}

/// Stable identity of a recurring condition: a deterministic function of
/// (entity, kind). Keys are reusable across alert lifecycles; alert ids
/// are not.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupeKey {
    pub entity_id: EntityId,
    pub kind: AlertKind,
}

impl DedupeKey {
    pub fn new(entity_id: EntityId, kind: AlertKind) -> Self {
        Self { entity_id, kind }
    }
}

impl core::fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{:?}", self.entity_id, self.kind)
    }
}

/// One alert lifecycle. Immutable once `resolved_at` is stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: AlertId,
    pub entity_id: EntityId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub dedupe_key: DedupeKey,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}
