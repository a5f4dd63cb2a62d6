use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use skydiary_weather::WeatherSnapshot;

/// A persisted diary entry.
///
/// `weather` is a copy of the snapshot resolved when the entry was written;
/// later refreshes never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub text: String,
    pub weather: WeatherSnapshot,
}

/// An entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDiaryEntry {
    pub date: NaiveDate,
    pub text: String,
    pub weather: WeatherSnapshot,
}

/// Caller-facing view of an entry: date, weather label and text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryInfo {
    pub date: NaiveDate,
    pub weather: String,
    pub text: String,
}

impl From<&DiaryEntry> for DiaryInfo {
    fn from(entry: &DiaryEntry) -> Self {
        Self {
            date: entry.date,
            weather: entry.weather.condition.clone(),
            text: entry.text.clone(),
        }
    }
}

/// Result of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedDiary {
    pub date: NaiveDate,
    pub removed: usize,
}
