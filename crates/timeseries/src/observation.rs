use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcast_core::{EntityId, Period};

/// One aggregated measurement for one entity and period.
///
/// Revision 0 is the original observation for the period; a late-arriving
/// correction for a closed period carries revision n+1 and supersedes the
/// older revisions on read (the log keeps all of them for audit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: EntityId,
    pub period: Period,
    /// Aggregated quantity for the period; never negative.
    pub value: f64,
    pub revision: u32,
    pub recorded_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(entity_id: EntityId, period: Period, value: f64) -> Self {
        Self {
            entity_id,
            period,
            value,
            revision: 0,
            recorded_at: Utc::now(),
        }
    }

    pub fn revised(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }
}

/// Ordered observations for one entity, revisions included.
///
/// Invariant: sorted by (period, revision); no two observations share a
/// period unless one is a strictly newer revision.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by(|a, b| (a.period, a.revision).cmp(&(b.period, b.revision)));
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Collapse revisions to the newest per period, in period order.
    pub fn latest(&self) -> Vec<Observation> {
        let mut out: Vec<Observation> = Vec::with_capacity(self.observations.len());
        for obs in &self.observations {
            match out.last_mut() {
                Some(last) if last.period == obs.period => {
                    if obs.revision > last.revision {
                        *last = obs.clone();
                    }
                }
                _ => out.push(obs.clone()),
            }
        }
        out
    }

    /// Realized values in period order (revisions collapsed).
    pub fn values(&self) -> Vec<f64> {
        self.latest().into_iter().map(|o| o.value).collect()
    }

    pub fn last_period(&self) -> Option<Period> {
        self.observations.last().map(|o| o.period)
    }
}
