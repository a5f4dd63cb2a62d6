//! Diary storage trait and text validation.
//!
//! This module defines the `DiaryStore` trait that abstracts over the
//! persistence engine. Weather snapshot persistence comes from the
//! `SnapshotStore` supertrait so one store backs both the diary and the
//! weather cache.

use chrono::NaiveDate;
use skydiary_core::DatabaseError;
use skydiary_weather::SnapshotStore;

use crate::diary::{DiaryEntry, NewDiaryEntry};
use crate::error::{DiaryError, DiaryResult};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, DatabaseError>;

/// Persistence for diary entries, keyed by date.
///
/// "Storage order" below means insertion order.
///
/// Note: Implementations don't need to be Sync - callers share the store
/// behind a Mutex.
pub trait DiaryStore: SnapshotStore {
    /// Insert a new entry and return it with its assigned id.
    fn save_diary(&self, entry: &NewDiaryEntry) -> StoreResult<DiaryEntry>;

    /// Replace a stored entry (matched by id).
    ///
    /// # Errors
    /// Returns `DatabaseError::QueryFailed` if no entry has that id.
    fn update_diary(&self, entry: &DiaryEntry) -> StoreResult<DiaryEntry>;

    /// All entries filed under `date`, in storage order.
    fn find_diaries_by_date(&self, date: NaiveDate) -> StoreResult<Vec<DiaryEntry>>;

    /// All entries with `start <= date <= end`, in storage order.
    fn find_diaries_between(&self, start: NaiveDate, end: NaiveDate)
        -> StoreResult<Vec<DiaryEntry>>;

    /// The first entry filed under `date`.
    fn first_diary_by_date(&self, date: NaiveDate) -> StoreResult<Option<DiaryEntry>>;

    fn exists_by_date(&self, date: NaiveDate) -> StoreResult<bool>;

    /// Remove every entry filed under `date`; returns how many were removed.
    fn delete_all_by_date(&self, date: NaiveDate) -> StoreResult<usize>;

    /// Run `f` as one unit: either all of its writes land or none do.
    ///
    /// The default runs `f` directly, for stores without transactions.
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        f(self)
    }
}

/// Maximum diary text length, in characters.
pub const MAX_TEXT_LENGTH: usize = 255;

/// Validate diary text.
///
/// Length is counted in characters, so 255 Hangul syllables are accepted even
/// though they take 765 bytes.
///
/// # Errors
/// Returns `DiaryError::TextTooLong` if text exceeds `MAX_TEXT_LENGTH`.
pub fn validate_text(text: &str) -> DiaryResult<()> {
    let length = text.chars().count();
    if length > MAX_TEXT_LENGTH {
        return Err(DiaryError::TextTooLong {
            length,
            max: MAX_TEXT_LENGTH,
        });
    }
    Ok(())
}
