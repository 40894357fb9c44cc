//! Retry utilities for resilient operations
//!
//! Exponential backoff around a single remote call. The orchestrator never
//! retries on its own schedule beyond this; anything still failing here is
//! left in the offline queue for the next trigger.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy for one remote call
///
/// Attempt `n` (1-based retry) waits `base_delay * 2^(n-1)`, capped at
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    pub base_delay: Duration,

    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Execute an operation with retry logic, using a custom retry predicate
///
/// Errors for which `should_retry` returns `false` are returned immediately.
/// When all attempts fail, the last error is returned.
///
/// # Example
///
/// ```no_run
/// use rollcall::utils::retry::{with_retry_if, RetryConfig};
/// use std::time::Duration;
///
/// async fn post() -> Result<(), std::io::Error> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<(), std::io::Error> {
/// let config = RetryConfig::new(2, Duration::from_millis(200), Duration::from_secs(2));
/// with_retry_if(&config, || post(), |e| e.kind() == std::io::ErrorKind::TimedOut).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        // Apply exponential backoff for retries
        if attempt > 0 {
            let delay = config.delay_for(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
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

                if attempt >= config.max_retries {
                    warn!(
                        attempts = attempt + 1,
                        error = %e,
                        "Retries exhausted"
                    );
                    return Err(e);
                }

                warn!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed, will retry"
                );
                attempt += 1;
            }
        }
    }
}
