//! Bounded retry with a fixed inter-attempt delay
//!
//! Wraps recoverable operations (network calls to a source connector or
//! the indexing service). The delay is deliberately fixed rather than
//! exponential, preserving the observed policy. Failures inside item-level
//! business logic are never routed through this executor.

use std::future::Future;
use std::time::Duration;

/// Executes an operation up to `max_attempts` times
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    delay: Duration,
}

impl RetryExecutor {
    /// Creates an executor with at least one attempt
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `op`, retrying on failure while attempts remain
    ///
    /// Returns the operation's final result together with the number of
    /// invocations made. An operation succeeding on attempt `j` is invoked
    /// `j` times with `j - 1` delays; total failure makes exactly
    /// `max_attempts` invocations and returns the last observed error.
    /// Each retried attempt is logged; logging never alters the outcome.
    pub async fn execute<T, E, Op, Fut>(&self, label: &str, mut op: Op) -> (std::result::Result<T, E>, u32)
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return (Ok(value), attempt),
                Err(error) if attempt < self.max_attempts => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}. Retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        label,
                        error,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(error) => return (Err(error), attempt),
            }
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
