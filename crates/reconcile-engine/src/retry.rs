//! Bounded retry with exponential backoff for store round-trips.
//!
//! The invite resolver and notification synchronizer wrap their store
//! calls in this policy; a transient store failure is retried a few
//! times before the component degrades.

use std::fmt::Display;
use std::future::Future;
use tokio::time::Duration;
use tracing::debug;

/// Retry configuration.
///
/// Delay follows binary exponential backoff:
/// `base_delay * 2^(attempt - 1)`, capped at `max_delay`. With the
/// defaults the schedule is 250ms, 500ms before the third and final
/// attempt fails through.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Cap on the computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries, for tests and call sites that
    /// want single-shot semantics.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the given attempt (attempts count from 1; the
    /// first attempt has no delay).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let shift = attempt.saturating_sub(2);
        let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(multiplier).min(max_ms))
    }

    /// Runs `operation`, retrying on error until the attempt budget
    /// is spent. Returns the first success or the last error.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Display,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts => {
                    let delay = self.backoff(attempt + 1);
                    debug!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying store call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(100), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn run_returns_first_success() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_retries_until_budget_spent() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("store unreachable".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_recovers_after_transient_failure() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 1 {
                        Err("transient".to_string())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn none_policy_is_single_shot() {
        let policy = RetryPolicy::none();
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
