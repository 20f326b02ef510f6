//! Bounded retry with configurable backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use docroute_core::config::{BackoffConfig, RetryConfig};

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffConfig,
}

impl RetryPolicy {
    /// Build a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Build a policy from a configuration section.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff)
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, BackoffConfig::None)
    }

    /// Total attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given retry (1 for the first retry).
    pub fn delay_before(&self, retry: u32) -> Duration {
        match self.backoff {
            BackoffConfig::None => Duration::ZERO,
            BackoffConfig::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            BackoffConfig::Exponential {
                initial_delay_ms,
                max_delay_ms,
            } => {
                let factor = 1u64
                    .checked_shl(retry.saturating_sub(1))
                    .unwrap_or(u64::MAX);
                Duration::from_millis(initial_delay_ms.saturating_mul(factor).min(max_delay_ms))
            }
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation: &str,
        mut op: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts || !is_transient(&err) => return Err(err),
                Err(err) => {
                    let delay = self.delay_before(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy = RetryPolicy::new(
            5,
            BackoffConfig::Exponential {
                initial_delay_ms: 200,
                max_delay_ms: 1000,
            },
        );
        assert_eq!(policy.delay_before(1), Duration::from_millis(200));
        assert_eq!(policy.delay_before(2), Duration::from_millis(400));
        assert_eq!(policy.delay_before(3), Duration::from_millis(800));
        assert_eq!(policy.delay_before(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(80), Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, BackoffConfig::None).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_use_every_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, BackoffConfig::None);
        let result: Result<(), String> = policy
            .run(
                "flaky",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("down".to_string()) }
                },
                |_| true,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, BackoffConfig::None);
        let result: Result<(), String> = policy
            .run(
                "rejected",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("no".to_string()) }
                },
                |_| false,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy::new(3, BackoffConfig::Fixed { delay_ms: 500 });
        let started = tokio::time::Instant::now();
        let result = policy
            .run(
                "eventually",
                |attempt| async move {
                    if attempt < 3 { Err("later") } else { Ok(attempt) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }
}
