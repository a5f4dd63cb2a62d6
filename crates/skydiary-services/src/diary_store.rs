//! SQLite-based diary storage implementation.
//!
//! This module provides `SqliteDiaryStore`, the local SQLite implementation of
//! `DiaryStore` and `SnapshotStore`. Diary rows carry their weather by value;
//! `date_weather` is the weather cache.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use skydiary_core::{DatabaseError, RusqliteErrorExt};
use skydiary_weather::{SnapshotStore, WeatherSnapshot};
use std::path::Path;

use crate::date::DATE_FORMAT;
use crate::diary::{DiaryEntry, NewDiaryEntry};
use crate::diary_backend::{DiaryStore, StoreResult};

const DIARY_COLUMNS: &str =
    "id, date, text, weather_date, weather, weather_icon, weather_temperature";

/// SQLite-based diary storage.
pub struct SqliteDiaryStore {
    conn: Connection,
}

impl SqliteDiaryStore {
    /// Open (or create) a diary database at the given path.
    ///
    /// Creates the parent directory and schema if they don't exist.
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory diary store.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS date_weather (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                weather TEXT NOT NULL,
                icon TEXT NOT NULL,
                temperature REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS diaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                text TEXT NOT NULL,
                weather_date TEXT NOT NULL,
                weather TEXT NOT NULL,
                weather_icon TEXT NOT NULL,
                weather_temperature REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_date_weather_date ON date_weather(date);
            CREATE INDEX IF NOT EXISTS idx_diaries_date ON diaries(date);
            "#,
        )?;
        Ok(())
    }

    /// Number of stored diary entries.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM diaries", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(count as usize)
    }

    fn query_diaries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<DiaryEntry>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(RusqliteErrorExt::into_database_error)?;

        let rows = stmt
            .query_map(params, Self::row_to_diary)
            .map_err(RusqliteErrorExt::into_database_error)?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(RusqliteErrorExt::into_database_error)
    }

    fn row_to_diary(row: &rusqlite::Row) -> rusqlite::Result<DiaryEntry> {
        Ok(DiaryEntry {
            id: row.get(0)?,
            date: date_column(row, 1)?,
            text: row.get(2)?,
            weather: WeatherSnapshot {
                date: date_column(row, 3)?,
                condition: row.get(4)?,
                icon: row.get(5)?,
                temperature: row.get(6)?,
            },
        })
    }
}

fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl SnapshotStore for SqliteDiaryStore {
    fn save_weather(&self, snapshot: &WeatherSnapshot) -> StoreResult<WeatherSnapshot> {
        self.conn
            .execute(
                "INSERT INTO date_weather (date, weather, icon, temperature) VALUES (?1, ?2, ?3, ?4)",
                params![
                    date_text(snapshot.date),
                    snapshot.condition,
                    snapshot.icon,
                    snapshot.temperature
                ],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;

        tracing::debug!("Stored weather snapshot for {}", snapshot.date);
        Ok(snapshot.clone())
    }

    fn find_weather_by_date(&self, date: NaiveDate) -> StoreResult<Vec<WeatherSnapshot>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT date, weather, icon, temperature FROM date_weather WHERE date = ?1 ORDER BY id ASC",
            )
            .map_err(RusqliteErrorExt::into_database_error)?;

        let rows = stmt
            .query_map(params![date_text(date)], |row| {
                Ok(WeatherSnapshot {
                    date: date_column(row, 0)?,
                    condition: row.get(1)?,
                    icon: row.get(2)?,
                    temperature: row.get(3)?,
                })
            })
            .map_err(RusqliteErrorExt::into_database_error)?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(RusqliteErrorExt::into_database_error)
    }
}

impl DiaryStore for SqliteDiaryStore {
    fn save_diary(&self, entry: &NewDiaryEntry) -> StoreResult<DiaryEntry> {
        self.conn
            .execute(
                r#"
                INSERT INTO diaries (date, text, weather_date, weather, weather_icon, weather_temperature)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    date_text(entry.date),
                    entry.text,
                    date_text(entry.weather.date),
                    entry.weather.condition,
                    entry.weather.icon,
                    entry.weather.temperature,
                ],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Created diary with ID: {}", id);

        Ok(DiaryEntry {
            id,
            date: entry.date,
            text: entry.text.clone(),
            weather: entry.weather.clone(),
        })
    }

    fn update_diary(&self, entry: &DiaryEntry) -> StoreResult<DiaryEntry> {
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE diaries
                SET date = ?1, text = ?2, weather_date = ?3, weather = ?4, weather_icon = ?5, weather_temperature = ?6
                WHERE id = ?7
                "#,
                params![
                    date_text(entry.date),
                    entry.text,
                    date_text(entry.weather.date),
                    entry.weather.condition,
                    entry.weather.icon,
                    entry.weather.temperature,
                    entry.id,
                ],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;

        if changed == 0 {
            return Err(DatabaseError::QueryFailed(format!(
                "no diary with id {}",
                entry.id
            )));
        }

        tracing::debug!("Updated diary: {}", entry.id);
        Ok(entry.clone())
    }

    fn find_diaries_by_date(&self, date: NaiveDate) -> StoreResult<Vec<DiaryEntry>> {
        self.query_diaries(
            &format!("SELECT {} FROM diaries WHERE date = ?1 ORDER BY id ASC", DIARY_COLUMNS),
            params![date_text(date)],
        )
    }

    fn find_diaries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DiaryEntry>> {
        self.query_diaries(
            &format!(
                "SELECT {} FROM diaries WHERE date BETWEEN ?1 AND ?2 ORDER BY id ASC",
                DIARY_COLUMNS
            ),
            params![date_text(start), date_text(end)],
        )
    }

    fn first_diary_by_date(&self, date: NaiveDate) -> StoreResult<Option<DiaryEntry>> {
        let mut entries = self.query_diaries(
            &format!(
                "SELECT {} FROM diaries WHERE date = ?1 ORDER BY id ASC LIMIT 1",
                DIARY_COLUMNS
            ),
            params![date_text(date)],
        )?;
        Ok(entries.pop())
    }

    fn exists_by_date(&self, date: NaiveDate) -> StoreResult<bool> {
        let exists: i64 = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM diaries WHERE date = ?1)",
                params![date_text(date)],
                |row| row.get(0),
            )
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(exists != 0)
    }

    fn delete_all_by_date(&self, date: NaiveDate) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM diaries WHERE date = ?1", params![date_text(date)])
            .map_err(RusqliteErrorExt::into_database_error)?;

        tracing::debug!("Deleted {} diaries for {}", removed, date);
        Ok(removed)
    }

    /// Wraps `f` in a SQLite transaction; rolled back unless `f` succeeds.
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(DatabaseError::TransactionFailed(e.to_string())))?;

        let value = f(self)?;

        tx.commit()
            .map_err(|e| E::from(DatabaseError::TransactionFailed(e.to_string())))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn create_test_store() -> SqliteDiaryStore {
        SqliteDiaryStore::in_memory().expect("Failed to create in-memory store")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn draft(date: NaiveDate, text: &str, condition: &str) -> NewDiaryEntry {
        NewDiaryEntry {
            date,
            text: text.to_string(),
            weather: WeatherSnapshot::new(date, condition, "01d", 303.91),
        }
    }

    #[test]
    fn test_save_and_find_by_date() {
        let store = create_test_store();

        let saved = store.save_diary(&draft(day(29), "안녕", "Clear")).unwrap();
        assert!(saved.id > 0);

        let found = store.find_diaries_by_date(day(29)).unwrap();
        assert_eq!(found, vec![saved]);
    }

    #[test]
    fn test_find_by_date_keeps_insertion_order() {
        let store = create_test_store();
        store.save_diary(&draft(day(29), "first", "Clear")).unwrap();
        store.save_diary(&draft(day(28), "other day", "Rain")).unwrap();
        store.save_diary(&draft(day(29), "second", "Clouds")).unwrap();

        let texts: Vec<_> = store
            .find_diaries_by_date(day(29))
            .unwrap()
            .into_iter()
            .map(|d| d.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(store.first_diary_by_date(day(29)).unwrap().unwrap().text, "first");
    }

    #[test]
    fn test_find_between_is_inclusive() {
        let store = create_test_store();
        for d in [27, 28, 29, 30] {
            store.save_diary(&draft(day(d), &format!("day {}", d), "Clear")).unwrap();
        }

        let found = store.find_diaries_between(day(28), day(29)).unwrap();
        let dates: Vec<_> = found.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![day(28), day(29)]);
    }

    #[test]
    fn test_exists_and_first_on_empty_date() {
        let store = create_test_store();
        assert!(!store.exists_by_date(day(29)).unwrap());
        assert!(store.first_diary_by_date(day(29)).unwrap().is_none());
    }

    #[test]
    fn test_update_replaces_text() {
        let store = create_test_store();
        let mut entry = store.save_diary(&draft(day(29), "before", "Clouds")).unwrap();

        entry.text = "after".to_string();
        store.update_diary(&entry).unwrap();

        let reloaded = store.first_diary_by_date(day(29)).unwrap().unwrap();
        assert_eq!(reloaded.text, "after");
        assert_eq!(reloaded.weather.condition, "Clouds");
        assert_eq!(reloaded.id, entry.id);
    }

    #[test]
    fn test_update_nonexistent() {
        let store = create_test_store();
        let ghost = DiaryEntry {
            id: 99999,
            date: day(29),
            text: "ghost".to_string(),
            weather: WeatherSnapshot::new(day(29), "Clear", "01d", 300.0),
        };
        assert!(matches!(
            store.update_diary(&ghost),
            Err(DatabaseError::QueryFailed(_))
        ));
    }

    #[test]
    fn test_delete_all_by_date() {
        let store = create_test_store();
        store.save_diary(&draft(day(29), "a", "Clear")).unwrap();
        store.save_diary(&draft(day(29), "b", "Clear")).unwrap();
        store.save_diary(&draft(day(30), "c", "Clear")).unwrap();

        assert_eq!(store.delete_all_by_date(day(29)).unwrap(), 2);
        assert!(!store.exists_by_date(day(29)).unwrap());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_weather_snapshots_keep_insertion_order() {
        let store = create_test_store();
        store.save_weather(&WeatherSnapshot::new(day(29), "Clouds", "03d", 295.0)).unwrap();
        store.save_weather(&WeatherSnapshot::new(day(29), "Clear", "01d", 300.0)).unwrap();
        store.save_weather(&WeatherSnapshot::new(day(30), "Rain", "10d", 290.0)).unwrap();

        let found = store.find_weather_by_date(day(29)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].condition, "Clouds");
        assert!((found[0].temperature - 295.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let store = create_test_store();

        let result: Result<(), DatabaseError> = store.atomically(|s| {
            s.save_diary(&draft(day(29), "doomed", "Clear"))?;
            Err(DatabaseError::QueryFailed("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_atomically_commits_on_success() {
        let store = create_test_store();

        let saved: Result<DiaryEntry, DatabaseError> =
            store.atomically(|s| s.save_diary(&draft(day(29), "kept", "Clear")));

        assert!(saved.is_ok());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("diary.db");

        {
            let store = SqliteDiaryStore::new(&path).unwrap();
            store.save_diary(&draft(day(29), "persisted", "Clear")).unwrap();
        }

        let reopened = SqliteDiaryStore::new(&path).unwrap();
        assert_eq!(reopened.find_diaries_by_date(day(29)).unwrap()[0].text, "persisted");
    }
}
