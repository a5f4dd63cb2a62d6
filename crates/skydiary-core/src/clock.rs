//! Injectable source of "today".
//!
//! Diary entries and fresh weather snapshots are stamped with the current
//! local date. Going through a `Clock` keeps that stamp deterministic in tests.

use chrono::{DateTime, Local, NaiveDate};

pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Local>,
}

impl FixedClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self { at }
    }

    /// Pin the clock to local noon of `date`.
    pub fn on(date: NaiveDate) -> Self {
        let at = date
            .and_hms_opt(12, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .unwrap_or_else(Local::now);
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.at
    }
}
