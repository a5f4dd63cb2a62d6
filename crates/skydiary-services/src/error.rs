//! Diary operation errors and their caller-visible form.

use chrono::NaiveDate;
use skydiary_core::{DatabaseError, ErrorCode, ErrorResponse, NetworkError};
use skydiary_weather::WeatherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("Invalid date format: {0:?} (expected yyyy-MM-dd)")]
    InvalidDateFormat(String),

    #[error("Diary text is {length} characters, limit is {max}")]
    TextTooLong { length: usize, max: usize },

    #[error("Invalid date period: {start} is after {end}")]
    InvalidDatePeriod { start: NaiveDate, end: NaiveDate },

    #[error("No diary for {0}")]
    DiaryNotFound(NaiveDate),

    #[error("Weather provider unavailable: {0}")]
    ProviderUnavailable(#[source] NetworkError),

    /// Store failures and other unexpected faults.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for diary operations.
pub type DiaryResult<T> = Result<T, DiaryError>;

impl DiaryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidDateFormat(_) => ErrorCode::InvalidDateFormat,
            Self::TextTooLong { .. } => ErrorCode::TextTooLong,
            Self::InvalidDatePeriod { .. } => ErrorCode::InvalidDatePeriod,
            Self::DiaryNotFound(_) => ErrorCode::DiaryNotFound,
            Self::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            Self::Internal(_) => ErrorCode::InternalServerError,
        }
    }

    /// Whether the same call may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(e) if e.is_transient())
    }
}

impl From<WeatherError> for DiaryError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::ProviderUnavailable(e) => Self::ProviderUnavailable(e),
            WeatherError::Store(e) => Self::from(e),
        }
    }
}

impl From<DatabaseError> for DiaryError {
    fn from(err: DatabaseError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Outermost error boundary: log everything, expose only kind + description.
impl From<&DiaryError> for ErrorResponse {
    fn from(err: &DiaryError) -> Self {
        match err {
            DiaryError::Internal(detail) => {
                tracing::error!("Unexpected failure: {}", detail);
            }
            other => {
                tracing::error!("{:?} occurred: {}", other.code(), other);
            }
        }
        ErrorResponse::from(err.code())
    }
}
