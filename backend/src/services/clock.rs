//! Source of "today" for the ledger

use chrono::NaiveDate;

pub trait Clock: Send + Sync {
    /// Current date on the local civil calendar
    fn today(&self) -> NaiveDate;
}

/// Server-local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        shared::local_today()
    }
}

/// Always reports the same date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
