//! Date source for versioned notes.

use chrono::NaiveDate;

/// Supplies "today" in the local time zone.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}
