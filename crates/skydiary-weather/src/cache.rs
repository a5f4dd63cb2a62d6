//! Per-date weather resolution backed by a snapshot store.
//!
//! A stored snapshot always wins over a live provider call. Only the daily
//! refresh (and opt-in write-through) adds snapshots to the store.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use skydiary_core::DatabaseError;
use tracing::instrument;

use crate::provider::WeatherSource;
use crate::types::{WeatherError, WeatherSnapshot};

/// Persistence for weather snapshots, keyed by date.
pub trait SnapshotStore: Send + 'static {
    /// Append a snapshot. Several snapshots may share a date.
    fn save_weather(&self, snapshot: &WeatherSnapshot) -> Result<WeatherSnapshot, DatabaseError>;

    /// All snapshots for `date`, oldest first.
    fn find_weather_by_date(&self, date: NaiveDate) -> Result<Vec<WeatherSnapshot>, DatabaseError>;
}

pub struct WeatherCache<P, S> {
    provider: Arc<P>,
    store: Arc<Mutex<S>>,
    write_through: bool,
}

impl<P, S> Clone for WeatherCache<P, S> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            store: Arc::clone(&self.store),
            write_through: self.write_through,
        }
    }
}

impl<P, S> WeatherCache<P, S>
where
    P: WeatherSource,
    S: SnapshotStore,
{
    pub fn new(provider: Arc<P>, store: Arc<Mutex<S>>) -> Self {
        Self {
            provider,
            store,
            write_through: false,
        }
    }

    /// Also persist snapshots fetched on demand by `resolve`.
    pub fn with_write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    /// Weather for `date`: the first stored snapshot, else a live fetch.
    ///
    /// # Errors
    /// `WeatherError::ProviderUnavailable` when nothing is cached and the
    /// provider fails; `WeatherError::Store` when the lookup itself fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, date: NaiveDate) -> Result<WeatherSnapshot, WeatherError> {
        let cached = self
            .with_store(move |store| store.find_weather_by_date(date))
            .await?;

        if let Some(snapshot) = cached.into_iter().next() {
            tracing::debug!("Weather cache hit for {}", date);
            return Ok(snapshot);
        }

        tracing::debug!("Weather cache miss for {}, asking provider", date);
        let snapshot = self.provider.fetch_current().await?;

        if self.write_through {
            let to_store = snapshot.clone();
            self.with_store(move |store| store.save_weather(&to_store))
                .await?;
            tracing::debug!("Stored on-demand weather for {}", snapshot.date);
        }

        Ok(snapshot)
    }

    /// Fetch current weather and always store it, even when the date already
    /// has a snapshot.
    ///
    /// # Errors
    /// `WeatherError::ProviderUnavailable` if the fetch fails; nothing is
    /// stored in that case.
    #[instrument(skip(self), level = "info")]
    pub async fn refresh_daily(&self) -> Result<WeatherSnapshot, WeatherError> {
        let snapshot = self.provider.fetch_current().await?;
        let to_store = snapshot.clone();
        let stored = self
            .with_store(move |store| store.save_weather(&to_store))
            .await?;

        tracing::info!(
            "Stored daily weather for {}: {}",
            stored.date,
            stored.condition
        );
        Ok(stored)
    }

    /// Run `f` against the store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T, WeatherError>
    where
        F: FnOnce(&S) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store.lock()))
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(format!("store task failed: {}", e)))?
            .map_err(WeatherError::from)
    }
}
