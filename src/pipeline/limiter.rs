//! Shared token-bucket rate limiter
//!
//! Bounds the aggregate rate of outbound calls across all workers. Tokens
//! regenerate continuously at the configured rate; bucket capacity equals
//! one second's worth of permits, so a fresh limiter allows an initial
//! burst before pacing kicks in.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter shared by all workers
///
/// `acquire` blocks the caller until a token is available. Safe to call
/// concurrently; waiters are not strictly FIFO but none can starve, since
/// each sleeps only for its computed shortfall and re-contends.
pub struct RateLimiter {
    permits_per_second: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Creates a limiter issuing `permits_per_second` tokens per second
    ///
    /// The rate must be positive; config validation enforces this before
    /// a limiter is ever constructed.
    pub fn new(permits_per_second: f64) -> Self {
        debug_assert!(permits_per_second > 0.0);
        Self {
            permits_per_second,
            state: Mutex::new(BucketState {
                tokens: permits_per_second,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Blocks until a token is available, then consumes it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.permits_per_second)
                    .min(self.permits_per_second);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.permits_per_second)
            };

            tokio::time::sleep(wait).await;
        }
    }

    pub fn permits_per_second(&self) -> f64 {
        self.permits_per_second
    }
}
