//! Bounded retry with exponential backoff.

use log::{debug, warn};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Number of attempts made before giving up.
pub const MAX_ATTEMPTS: usize = 3;

/// Delay after the first failed attempt; doubled after each further failure.
pub const BASE_DELAY: Duration = Duration::from_millis(100);

/// Fixed-attempt exponential backoff. Every error is retried; there is no
/// jitter and no cap, and no delay follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay.saturating_mul(1u32 << shift)
    }

    /// Runs `operation` until it succeeds or the attempts run out.
    ///
    /// On exhaustion the returned error carries the last attempt's error as
    /// its cause and every attempt's message in its context.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut failures: Vec<Value> = Vec::with_capacity(attempts);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("{}: succeeded on attempt {}/{}", operation_name, attempt, attempts);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    failures.push(Value::String(e.to_string()));

                    if attempt < attempts {
                        let delay = self.delay_after(attempt);
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                            operation_name,
                            attempt,
                            attempts,
                            e,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(Error::new(
            ErrorKind::OperationFailed,
            format!("{}: failed after {} attempts", operation_name, attempts),
            last_error,
        )
        .with_context_entry("attempts", attempts)
        .with_context_entry("errors", Value::Array(failures)))
    }
}
