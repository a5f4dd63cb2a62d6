//! Diary operations: validation, weather lookup and persistence.
//!
//! Every operation validates its inputs in a fixed order and reports the first
//! violation. Store work for one operation runs in a single transaction on the
//! blocking pool; the weather lookup in `create` happens before that
//! transaction opens, so a slow provider never holds the store lock.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use skydiary_core::{Clock, DatabaseError, DiaryConfig, EntryDatePolicy};
use skydiary_weather::{WeatherCache, WeatherSnapshot, WeatherSource};
use tracing::instrument;

use crate::date::{parse_diary_date, DatePeriod};
use crate::diary::{DeletedDiary, DiaryEntry, NewDiaryEntry};
use crate::diary_backend::{validate_text, DiaryStore};
use crate::error::{DiaryError, DiaryResult};

pub struct DiaryManager<P, S> {
    cache: WeatherCache<P, S>,
    store: Arc<Mutex<S>>,
    clock: Arc<dyn Clock>,
    entry_date: EntryDatePolicy,
}

impl<P, S> DiaryManager<P, S>
where
    P: WeatherSource,
    S: DiaryStore,
{
    pub fn new(provider: Arc<P>, store: Arc<Mutex<S>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: WeatherCache::new(provider, Arc::clone(&store)),
            store,
            clock,
            entry_date: EntryDatePolicy::default(),
        }
    }

    /// Apply the `[diary]` settings: entry date policy and write-through.
    pub fn with_config(mut self, config: &DiaryConfig) -> Self {
        self.entry_date = config.entry_date;
        self.cache = self.cache.with_write_through(config.write_through);
        self
    }

    /// Create an entry for `date` annotated with that day's weather.
    ///
    /// The entry is filed under today's date unless the manager was configured
    /// with `EntryDatePolicy::Requested`.
    ///
    /// # Errors
    /// `InvalidDateFormat`, then `TextTooLong`, then `ProviderUnavailable`
    /// when no snapshot is stored and the provider fails.
    #[instrument(skip(self, text), level = "info")]
    pub async fn create(&self, date: &str, text: &str) -> DiaryResult<DiaryEntry> {
        let requested = parse_diary_date(date)?;
        validate_text(text)?;

        let weather = self.cache.resolve(requested).await?;

        let draft = NewDiaryEntry {
            date: self.entry_date_for(requested),
            text: text.to_string(),
            weather,
        };

        let entry = self
            .in_transaction(move |store| Ok(store.save_diary(&draft)?))
            .await?;

        tracing::info!(
            "Created diary {} for {} ({})",
            entry.id,
            entry.date,
            entry.weather.condition
        );
        Ok(entry)
    }

    /// All entries filed under `date`, in storage order.
    ///
    /// # Errors
    /// `InvalidDateFormat`, then `DiaryNotFound` when the date has no entries.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_by_date(&self, date: &str) -> DiaryResult<Vec<DiaryEntry>> {
        let date = parse_diary_date(date)?;

        self.in_transaction(move |store| {
            let entries = store.find_diaries_by_date(date)?;
            if entries.is_empty() {
                return Err(DiaryError::DiaryNotFound(date));
            }
            Ok(entries)
        })
        .await
    }

    /// All entries with `start <= date <= end`, in storage order.
    ///
    /// # Errors
    /// `InvalidDateFormat` for either bound, then `InvalidDatePeriod`, then
    /// `DiaryNotFound` when the range is empty.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_by_range(&self, start: &str, end: &str) -> DiaryResult<Vec<DiaryEntry>> {
        let period = DatePeriod::parse(start, end)?;

        self.in_transaction(move |store| {
            let entries = store.find_diaries_between(period.start, period.end)?;
            if entries.is_empty() {
                return Err(DiaryError::DiaryNotFound(period.start));
            }
            Ok(entries)
        })
        .await
    }

    /// Replace the text of the first entry filed under `date`.
    ///
    /// Id, date and weather are kept.
    ///
    /// # Errors
    /// `InvalidDateFormat`, then `DiaryNotFound`, then `TextTooLong`.
    #[instrument(skip(self, text), level = "info")]
    pub async fn update(&self, date: &str, text: &str) -> DiaryResult<DiaryEntry> {
        let date = parse_diary_date(date)?;
        let text = text.to_string();

        let entry = self
            .in_transaction(move |store| {
                let mut entry = store
                    .first_diary_by_date(date)?
                    .ok_or(DiaryError::DiaryNotFound(date))?;
                validate_text(&text)?;

                entry.text = text;
                Ok(store.update_diary(&entry)?)
            })
            .await?;

        tracing::info!("Updated diary {} for {}", entry.id, entry.date);
        Ok(entry)
    }

    /// Remove every entry filed under `date`.
    ///
    /// # Errors
    /// `InvalidDateFormat`, then `DiaryNotFound`.
    #[instrument(skip(self), level = "info")]
    pub async fn delete(&self, date: &str) -> DiaryResult<DeletedDiary> {
        let date = parse_diary_date(date)?;

        let removed = self
            .in_transaction(move |store| {
                if !store.exists_by_date(date)? {
                    return Err(DiaryError::DiaryNotFound(date));
                }
                Ok(store.delete_all_by_date(date)?)
            })
            .await?;

        tracing::info!("Deleted {} diaries for {}", removed, date);
        Ok(DeletedDiary { date, removed })
    }

    /// Fetch today's weather and append it to the snapshot store.
    ///
    /// # Errors
    /// `ProviderUnavailable` if the fetch fails; nothing is stored then.
    pub async fn refresh_daily(&self) -> DiaryResult<WeatherSnapshot> {
        Ok(self.cache.refresh_daily().await?)
    }

    fn entry_date_for(&self, requested: NaiveDate) -> NaiveDate {
        match self.entry_date {
            EntryDatePolicy::Today => self.clock.today(),
            EntryDatePolicy::Requested => requested,
        }
    }

    /// Run `f` inside one store transaction on the blocking pool.
    async fn in_transaction<T, F>(&self, f: F) -> DiaryResult<T>
    where
        F: FnOnce(&S) -> DiaryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let guard = store.lock();
            guard.atomically(f)
        })
        .await
        .map_err(|e| {
            DiaryError::from(DatabaseError::ConnectionFailed(format!(
                "store task failed: {}",
                e
            )))
        })?
    }
}
