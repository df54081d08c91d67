//! Retry logic for store operations
//!
//! Transient store errors (network, throttling, server errors) are retried
//! with exponential backoff: 1s, 2s, 4s, 8s, 16s for the default five
//! retries. Anything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use s3putsecure_core::ports::StoreError;
use tracing::{info, warn};

/// Default number of retries for transient errors
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Determines whether an error is transient (retryable)
///
/// The adapter's [`StoreError`] classification decides; timed-out or
/// interrupted local I/O also counts. Context layers are looked through.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(store_err) = cause.downcast_ref::<StoreError>() {
            return store_err.is_transient();
        }
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                io_err.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            );
        }
        false
    })
}

/// Backoff schedule for transient errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_DELAY,
        }
    }

    /// Override the first backoff delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retrying after `err` failed attempt number `attempt`
    /// (0-based), or `None` if the error must be returned
    pub fn delay_for(&self, attempt: u32, err: &anyhow::Error) -> Option<Duration> {
        if attempt < self.max_retries && is_transient_error(err) {
            Some(self.base_delay.saturating_mul(2u32.saturating_pow(attempt)))
        } else {
            None
        }
    }

    /// Executes an async operation, retrying transient failures
    ///
    /// Non-transient errors are returned immediately.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempt, "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => match self.delay_for(attempt, &err) {
                    Some(delay) => {
                        self.log_retry(operation_name, attempt, delay, &err);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    /// Logs a retry decision made outside [`RetryPolicy::run`]
    pub fn log_retry(&self, operation_name: &str, attempt: u32, delay: Duration, err: &anyhow::Error) {
        warn!(
            operation = operation_name,
            attempt,
            delay_secs = delay.as_secs_f64(),
            error = %format!("{err:#}"),
            "Transient error, retrying"
        );
    }
}
