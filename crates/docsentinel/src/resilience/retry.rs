//! Retry with exponential backoff for transient collaborator failures.

use std::thread;
use std::time::Duration;

use crate::error::CollabError;

/// Decides whether a failure is worth retrying.
///
/// Only genuinely transient kinds belong in the whitelist; retrying a
/// permanent failure masks real bugs behind latency.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CollabError {
    fn is_retryable(&self) -> bool {
        CollabError::is_retryable(self)
    }
}

/// Executes an operation, retrying transient failures with exponential
/// backoff: `min(base_delay * 2^attempt, max_delay)`, attempt-indexed from 0.
///
/// The backoff sleep blocks the calling thread; the pipeline is synchronous
/// and the worker thread has nothing else to do while the dependency
/// recovers.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Runs `op` with at most `max_retries + 1` total attempts.
    ///
    /// Non-retryable errors propagate immediately. When attempts are
    /// exhausted the operation's own final error is returned, not a
    /// synthetic "retries exhausted" wrapper.
    pub fn run<T, E, F>(&self, name: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= self.max_retries {
                        log::error!(
                            "{} failed after {} attempts: {}",
                            name,
                            self.max_retries + 1,
                            e
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:.1}s...",
                        name,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay.as_secs_f64()
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Backoff delay for the given attempt index, capped at `max_delay`.
    ///
    /// Saturating arithmetic keeps the cap in force even when `2^attempt`
    /// overflows realistic durations.
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30))
    }
}
