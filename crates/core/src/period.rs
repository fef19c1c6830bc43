//! Period calendar: the daily aggregation bucket observations live in.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// One daily aggregation period.
///
/// Periods are contiguous and non-overlapping per entity; the store and the
/// model backends rely on `next()` producing the period immediately after.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(NaiveDate);

impl Period {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The immediately following period.
    pub fn next(&self) -> Self {
        // NaiveDate covers +/- ~262000 years; one day past an in-range date
        // cannot overflow for any period this engine stores.
        Self(self.0 + Days::new(1))
    }

    /// The period `offset` days away (negative = past).
    pub fn offset(&self, offset: i64) -> Self {
        Self(self.0 + chrono::Duration::days(offset))
    }

    /// Signed distance in periods from `other` to `self`.
    pub fn periods_since(&self, other: Period) -> i64 {
        (self.0 - other.0).num_days()
    }

    pub fn year_month(&self) -> (i32, u32) {
        (self.0.year(), self.0.month())
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Half-open period window `[start, end)` used for reads and evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: Period,
    pub end: Period,
}

impl PeriodWindow {
    pub fn new(start: Period, end: Period) -> Self {
        Self { start, end }
    }

    /// The `len` periods ending at (and including) `last`.
    pub fn trailing(last: Period, len: usize) -> Self {
        Self {
            start: last.offset(-(len as i64 - 1)),
            end: last.next(),
        }
    }

    pub fn contains(&self, period: Period) -> bool {
        period >= self.start && period < self.end
    }

    pub fn len(&self) -> usize {
        self.end.periods_since(self.start).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
