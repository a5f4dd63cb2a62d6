//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use skydiary_core::{FixedClock, NetworkError};
use skydiary_weather::{WeatherError, WeatherSnapshot, WeatherSource};

use crate::diary_store::SqliteDiaryStore;
use crate::manager::DiaryManager;

/// Replays queued replies in order; times out once the queue is empty.
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Result<WeatherSnapshot, WeatherError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn replying(replies: Vec<Result<WeatherSnapshot, WeatherError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WeatherSource for ScriptedSource {
    async fn fetch_current(&self) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or(Err(WeatherError::ProviderUnavailable(NetworkError::Timeout)))
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

pub fn snapshot(date: NaiveDate, condition: &str) -> WeatherSnapshot {
    WeatherSnapshot::new(date, condition, "01d", 303.91)
}

pub fn unavailable() -> WeatherError {
    WeatherError::ProviderUnavailable(NetworkError::ServerError {
        status: 503,
        message: "Service Unavailable".into(),
    })
}

/// A manager on an in-memory store whose clock reads `today`.
pub fn manager_on(
    today: NaiveDate,
    source: &Arc<ScriptedSource>,
) -> (
    DiaryManager<ScriptedSource, SqliteDiaryStore>,
    Arc<Mutex<SqliteDiaryStore>>,
) {
    let store = Arc::new(Mutex::new(SqliteDiaryStore::in_memory().unwrap()));
    let manager = DiaryManager::new(
        Arc::clone(source),
        Arc::clone(&store),
        Arc::new(FixedClock::on(today)),
    );
    (manager, store)
}
