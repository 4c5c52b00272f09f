use std::fmt::Display;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

use crate::core::config::RetryConfig;

/// Retries a fallible operation a fixed number of times.
///
/// The first call is attempt 1, so an operation runs at most `max_retry + 1`
/// times. Each retried failure is logged at debug level. When the budget runs
/// out the failure is logged at error level and the last error is returned
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retry: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retry: u32) -> Self {
        RetryPolicy {
            max_retry,
            delay: Duration::ZERO,
        }
    }

    /// A policy that runs the operation once.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Runs `operation`, retrying on any error.
    pub fn run<T, E, F>(&self, name: &str, operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        self.run_if(name, operation, |_| true)
    }

    /// Runs `operation`, retrying only errors for which `retryable` is true.
    /// Other errors are returned immediately.
    pub fn run_if<T, E, F, P>(&self, name: &str, mut operation: F, retryable: P) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match operation() {
                Ok(val) => return Ok(val),
                Err(err) if !retryable(&err) => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt > self.max_retry {
                error!(
                    operation = name,
                    attempt,
                    error = %err,
                    "Giving up after {} attempt(s)",
                    attempt
                );
                return Err(err);
            }

            debug!(
                operation = name,
                attempt,
                error = %err,
                "Attempt {}/{} failed. Retrying...",
                attempt,
                self.max_retry + 1
            );
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(config.max_retry).with_delay(Duration::from_millis(config.delay_ms))
    }
}
