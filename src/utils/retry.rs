//! Retry utilities for resilient operations
//!
//! This module provides the bounded exponential backoff shared by every
//! network call and browser navigation. The wrapper only repeats the call;
//! callers own any accumulation of results, so a retried fetch can never be
//! counted twice.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay floor in milliseconds
    pub min_delay_ms: u64,

    /// Delay ceiling in milliseconds
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_ms: 1000,
            max_delay_ms: 8000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with a custom attempt cap
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_attempts: u32, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            min_delay_ms,
            max_delay_ms,
            backoff_multiplier: 2.0,
        }
    }

    /// Policy used around browser launches and navigations
    pub fn browser() -> Self {
        Self::with_delays(2, 1000, 6000)
    }

    /// Calculate the delay before a given retry (retry 1 follows attempt 0)
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponential =
            self.min_delay_ms as f64 * self.backoff_multiplier.powi((retry - 1) as i32);
        let delay_ms = (exponential as u64)
            .max(self.min_delay_ms)
            .min(self.max_delay_ms.max(self.min_delay_ms));

        Duration::from_millis(delay_ms)
    }
}

/// Execute an operation with retry logic and exponential backoff
///
/// Returns the first success, or the last error once `max_attempts`
/// attempts have failed.
///
/// # Example
///
/// ```no_run
/// use jobtrail::utils::retry::{with_retry, RetryConfig};
///
/// async fn fetch_data() -> Result<String, std::io::Error> {
///     Ok("data".to_string())
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), std::io::Error> {
///     let config = RetryConfig::default();
///     let data = with_retry(&config, || async { fetch_data().await }).await?;
///     assert_eq!(data, "data");
///     Ok(())
/// }
/// ```
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(config, operation, |_| true).await
}

/// Execute an operation with retry logic, using a custom retry predicate
///
/// Errors for which `should_retry` returns `false` are returned immediately.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.calculate_delay(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(error = %e, "Non-retryable error encountered");
                    return Err(e);
                }

                attempt += 1;
                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Operation failed"
                );
                if attempt >= attempts {
                    return Err(e);
                }
            }
        }
    }
}
