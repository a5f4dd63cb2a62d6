//! Shared error types for SkyDiary.
//!
//! This module provides:
//! - `ErrorCode`, the caller-visible error kinds with fixed descriptions
//! - `ErrorResponse`, the kind + description pair handed to outer layers
//! - Typed network, database and configuration errors used across crates

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-visible error kinds.
///
/// Each kind has a fixed description; detailed context stays in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidDateFormat,
    TextTooLong,
    InvalidDatePeriod,
    DiaryNotFound,
    ProviderUnavailable,
    InternalServerError,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidDateFormat => "The date format is invalid. Use yyyy-MM-dd.",
            ErrorCode::TextTooLong => "The diary text is too long.",
            ErrorCode::InvalidDatePeriod => "The date period is invalid.",
            ErrorCode::DiaryNotFound => "There is no diary for that date.",
            ErrorCode::ProviderUnavailable => "Weather service unavailable. Please try again later.",
            ErrorCode::InternalServerError => "Internal server error.",
        }
    }
}

/// Error payload exposed to callers: kind plus description, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
}

impl From<ErrorCode> for ErrorResponse {
    fn from(code: ErrorCode) -> Self {
        Self {
            error_code: code,
            error_message: code.description().to_string(),
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

impl NetworkError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed(_) | NetworkError::Timeout => true,
            NetworkError::ServerError { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            NetworkError::InvalidResponse(_) | NetworkError::MissingCredential(_) => false,
        }
    }
}

/// Database/storage errors (SQLite).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) => {
                DatabaseError::Corruption(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}
