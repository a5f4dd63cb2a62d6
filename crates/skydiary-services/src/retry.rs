//! Retry utilities with exponential backoff.
//!
//! The caller decides which failures are worth another attempt; for the daily
//! weather refresh that means timeouts, connection failures, 5xx and 429.
//! Everything else fails on the first attempt.

use std::future::Future;
use std::time::Duration;

/// Default retry configuration
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries (doubles each attempt)
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Keep the default backoff but change the attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt + 1`: `initial * 2^attempt`, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent.
///
/// Returns the last error once attempts run out.
pub async fn with_retry<T, E, F, Fut, R>(
    config: &RetryConfig,
    mut operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => {
                tracing::debug!("Non-retryable error: {}", e);
                return Err(e);
            }
            Err(e) if attempt >= config.max_retries => {
                tracing::error!("All {} attempts exhausted: {}", attempt + 1, e);
                return Err(e);
            }
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "Retryable error on attempt {} of {}: {}; waiting {:?}",
                    attempt + 1,
                    config.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
