//! Source of "today" for history windows.

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// Current calendar day (UTC). History windows end just before this day.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Pinned clock for tests and replays.
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
