use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Prefix for environment overrides, e.g. `SKYDIARY__WEATHER__API_KEY`.
pub const ENV_PREFIX: &str = "SKYDIARY";

/// Read at load time when no key is configured; never written to disk.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Diary database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Scheduled weather refresh settings
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Diary behaviour switches
    #[serde(default)]
    pub diary: DiaryConfig,
}

/// OpenWeatherMap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key (`appid`). Falls back to `OPENWEATHER_API_KEY` at load time.
    #[serde(default)]
    pub api_key: Option<String>,

    /// City passed as the `q` query parameter
    #[serde(default = "default_city")]
    pub city: String,

    /// API base URL, without the `/weather` path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_city() -> String {
    "seoul".to_string()
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            city: default_city(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding diaries and weather snapshots
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skydiary")
        .join("diary.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Daily weather refresh. Defaults to 01:00 local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_enabled")]
    pub enabled: bool,

    #[serde(default = "default_refresh_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,

    /// Retries after a transient provider failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_refresh_enabled() -> bool {
    true
}

fn default_refresh_hour() -> u32 {
    1
}

fn default_max_retries() -> u32 {
    3
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_refresh_enabled(),
            hour: default_refresh_hour(),
            minute: 0,
            max_retries: default_max_retries(),
        }
    }
}

/// Which date a new diary entry is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryDatePolicy {
    /// The day the entry was written, whatever date the caller asked for.
    #[default]
    Today,
    /// The date the caller supplied.
    Requested,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiaryConfig {
    #[serde(default)]
    pub entry_date: EntryDatePolicy,

    /// Persist weather fetched on demand while creating an entry
    #[serde(default)]
    pub write_through: bool,
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, layered under `SKYDIARY__*` environment
    /// overrides. A missing file yields defaults plus overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::load_layered(path, ENV_PREFIX)?;
        config.fill_api_key(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// File values overridden by `{prefix}__SECTION__KEY` variables.
    ///
    /// Overrides stay strings until typed deserialization, so numeric-looking
    /// keys keep every digit.
    fn load_layered(path: &Path, prefix: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(prefix).separator("__"))
            .build()
            .context("Failed to read config sources")?;

        settings
            .try_deserialize()
            .context("Failed to parse config file")
    }

    fn fill_api_key(&mut self, fallback: Option<String>) {
        let configured = self.weather.api_key.as_deref().is_some_and(|k| !k.is_empty());
        if !configured {
            self.weather.api_key = fallback.filter(|k| !k.is_empty());
        }
    }

    /// Load configuration and validate it
    ///
    /// Logs warnings; fails on any validation error.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        match self.weather.api_key.as_deref() {
            None | Some("") => result.add_warning(
                "weather.api_key",
                "No weather API key configured - weather lookups will fail",
            ),
            Some(_) => {}
        }

        if self.weather.city.trim().is_empty() {
            result.add_error("weather.city", "City must not be empty");
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 120 {
            result.add_warning("weather.timeout_secs", "Timeout is unusually long (>120s)");
        }

        if self.refresh.hour > 23 {
            result.add_error("refresh.hour", "Hour must be between 0 and 23");
        }
        if self.refresh.minute > 59 {
            result.add_error("refresh.minute", "Minute must be between 0 and 59");
        }
        if !self.refresh.enabled {
            result.add_warning(
                "refresh.enabled",
                "Daily weather refresh disabled - the weather cache will not grow",
            );
        }

        if self.database.path.is_dir() {
            result.add_error(
                "database.path",
                format!("Path is a directory: {}", self.database.path.display()),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path` as TOML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skydiary");

        Ok(config_dir.join("config.toml"))
    }
}
