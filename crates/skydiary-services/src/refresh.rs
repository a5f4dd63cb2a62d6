//! Daily weather refresh.
//!
//! `RefreshScheduler` sleeps until the configured local time of day, appends
//! a fresh snapshot through `DiaryManager::refresh_daily`, and repeats until
//! its cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use skydiary_core::{Clock, ConfigError, RefreshConfig};
use skydiary_weather::{WeatherSnapshot, WeatherSource};
use tokio_util::sync::CancellationToken;

use crate::diary_backend::DiaryStore;
use crate::error::{DiaryError, DiaryResult};
use crate::manager::DiaryManager;
use crate::retry::{with_retry, RetryConfig};

/// The first instant strictly after `now` whose wall-clock time is `at`.
///
/// Days where `at` falls in a DST gap are skipped.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..=2 {
        let Some(day) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
    }

    now.clone() + chrono::Duration::days(1)
}

pub struct RefreshScheduler<P, S> {
    manager: Arc<DiaryManager<P, S>>,
    at: NaiveTime,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl<P, S> RefreshScheduler<P, S>
where
    P: WeatherSource + 'static,
    S: DiaryStore,
{
    /// # Errors
    /// `ConfigError::Invalid` if `hour:minute` is not a time of day.
    pub fn new(
        manager: Arc<DiaryManager<P, S>>,
        config: &RefreshConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let at = NaiveTime::from_hms_opt(config.hour, config.minute, 0).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "refresh time {:02}:{:02} is not a time of day",
                config.hour, config.minute
            ))
        })?;

        Ok(Self {
            manager,
            at,
            retry: RetryConfig::default().with_max_retries(config.max_retries),
            clock,
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// When the next refresh will fire.
    pub fn next_run(&self) -> DateTime<Local> {
        next_run_after(&self.clock.now(), self.at)
    }

    /// One refresh, retried on transient provider failures.
    pub async fn run_once(&self) -> DiaryResult<WeatherSnapshot> {
        with_retry(
            &self.retry,
            || self.manager.refresh_daily(),
            DiaryError::is_retryable,
        )
        .await
    }

    /// Refresh once a day until `token` is cancelled.
    ///
    /// A failed refresh is logged and the loop waits for the next day.
    pub async fn run(self, token: CancellationToken) {
        tracing::info!("Weather refresh scheduled daily at {}", self.at);

        loop {
            let next = self.next_run();
            let wait = (next - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            tracing::debug!("Next weather refresh at {} (in {:?})", next, wait);

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            tokio::select! {
                _ = token.cancelled() => break,
                result = self.run_once() => match result {
                    Ok(snapshot) => tracing::info!(
                        "Daily weather refresh stored {} for {}",
                        snapshot.condition,
                        snapshot.date
                    ),
                    Err(e) => tracing::error!("Daily weather refresh failed: {}", e),
                },
            }
        }

        tracing::info!("Weather refresh stopped");
    }
}
