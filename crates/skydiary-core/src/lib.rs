pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    Config, DatabaseConfig, DiaryConfig, EntryDatePolicy, RefreshConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{
    ConfigError, DatabaseError, ErrorCode, ErrorResponse, NetworkError, ReqwestErrorExt,
    RusqliteErrorExt,
};

use anyhow::Result;

/// Initialize logging for the SkyDiary process.
///
/// Honors `RUST_LOG`, falling back to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("SkyDiary core initialized");
    Ok(())
}
