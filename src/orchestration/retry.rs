//! # Retry with Backoff
//!
//! Bounded retries with exponential backoff, capped delay and optional jitter. The
//! caller decides which errors are worth another attempt.

use crate::error::TrafficError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Add up to 10% on top of each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the `attempt`-th failed attempt (1-based), or `None` once the
    /// budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let mut secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if self.jitter {
            secs *= 1.0 + rand::random::<f64>() * 0.1;
        }
        Some(self.capped(secs))
    }

    /// Clamp in floating point first; `Duration` arithmetic panics on overflow
    fn capped(&self, secs: f64) -> Duration {
        let cap = self.max_delay.as_secs_f64();
        if secs.is_nan() || secs >= cap {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Error of an operation whose retry budget ran out (or that failed permanently)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure {
    pub error: TrafficError,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails with an error `is_retryable` rejects, or
/// the policy's attempts are used up.
pub async fn retry_with_backoff<T, F, Fut, R>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: R,
    mut operation: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TrafficError>>,
    R: Fn(&TrafficError) -> bool,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let delay = if is_retryable(&error) {
                    policy.delay_after(attempt)
                } else {
                    None
                };
                match delay {
                    Some(delay) => {
                        warn!(
                            operation = operation_name,
                            attempt = attempt,
                            max_attempts = policy.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error_code = error.error_code(),
                            error = %error,
                            "🔄 Retrying after failure"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(RetryFailure {
                            error,
                            attempts: attempt,
                        })
                    }
                }
            }
        }
    }
}
