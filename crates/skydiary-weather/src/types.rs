use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use skydiary_core::{DatabaseError, NetworkError};

/// Weather observed on one calendar date.
///
/// `condition` and `icon` are the provider's own labels (e.g. "Clear", "01d");
/// `temperature` is in provider units (Kelvin for OpenWeatherMap defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub date: NaiveDate,
    pub condition: String,
    pub icon: String,
    pub temperature: f64,
}

impl WeatherSnapshot {
    pub fn new(
        date: NaiveDate,
        condition: impl Into<String>,
        icon: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            date,
            condition: condition.into(),
            icon: icon.into(),
            temperature,
        }
    }
}

/// Weather resolution errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    /// The remote provider could not produce a snapshot.
    #[error("Weather provider unavailable: {0}")]
    ProviderUnavailable(#[from] NetworkError),

    /// The snapshot store failed.
    #[error("Weather store error: {0}")]
    Store(#[from] DatabaseError),
}

impl WeatherError {
    /// Whether the scheduled refresh may try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            WeatherError::ProviderUnavailable(e) => e.is_transient(),
            WeatherError::Store(_) => false,
        }
    }
}
