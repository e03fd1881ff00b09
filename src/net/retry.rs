//! Bounded retries with exponential backoff

use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry bounds for [`retry_with_backoff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Delay before the first retry; doubles for each later retry
    pub initial_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            initial_delay_ms: 150,
        }
    }
}

impl RetryOptions {
    pub fn new(retries: u32, initial_delay_ms: u64) -> Self {
        Self {
            retries,
            initial_delay_ms,
        }
    }

    /// Total number of attempts, first one included
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Wait between attempt `attempt` and the next one (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.initial_delay_ms.saturating_mul(factor))
    }
}

/// Run `operation` until it succeeds or `options.retries + 1` attempts fail.
///
/// Every error is treated as retryable. When the last attempt fails its error
/// is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, options: RetryOptions) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("Operation succeeded on attempt {}", attempt + 1);
                }
                return Ok(value);
            }
            Err(error) if attempt >= options.retries => {
                warn!(
                    "Operation failed after {} attempt(s): {}",
                    options.max_attempts(),
                    error
                );
                return Err(error);
            }
            Err(error) => {
                let delay = options.delay_for(attempt);
                debug!(
                    "Attempt {} failed: {}; retrying in {}ms",
                    attempt + 1,
                    error,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
