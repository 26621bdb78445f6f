//! Retry policy for whole-operation retries.
//!
//! A policy is a bounded number of attempts with a delay that doubles after
//! each failure. Every error is retried the same way, without jitter.
//!
//! # Example
//!
//! ```rust,ignore
//! use awstools::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(5, Duration::from_secs(4));
//!
//! let result = policy.execute(|| async {
//!     // Your fallible operation here
//!     Ok::<_, Error>(())
//! }).await;
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of attempts for config refreshes.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait before the second attempt (2s doubled once).
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(4);

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay after the first failed attempt. Doubles after each later failure.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY)
    }
}

impl RetryPolicy {
    /// Create a policy whose delay doubles after every failed attempt.
    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor)
    }

    /// Execute an async operation with retry logic.
    ///
    /// The operation runs at most `max_attempts` times; a bound of zero fails
    /// without running it. No delay follows the final attempt.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            debug!("Attempt {} of {}", attempt + 1, self.max_attempts);

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!("Attempt {} of {} failed: {}", attempt + 1, self.max_attempts, e);
                    last_error = Some(e);

                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_for_attempt(attempt);
                        debug!("Waiting {:?} before retry", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(RetryError {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

/// Returned when every attempt failed.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Number of attempts made.
    pub attempts: u32,
    /// The last error encountered, `None` when no attempt was made.
    pub last_error: Option<E>,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.last_error {
            Some(e) => write!(
                f,
                "Giving up after {} attempts. Last error: {}",
                self.attempts, e
            ),
            None => write!(f, "No attempts allowed"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_policy_doubles_from_four_seconds() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(16));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(32));
    }

    #[test]
    fn test_delay_scales_with_initial_delay() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(250));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_saturates_on_large_attempts() {
        let policy = RetryPolicy::exponential(100, Duration::from_secs(4));
        assert_eq!(
            policy.delay_for_attempt(64),
            Duration::from_secs(4 * u64::from(u32::MAX))
        );
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<i32, RetryError<&str>> = policy
            .execute(|| {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<i32, RetryError<&str>> = policy
            .execute(|| {
                let c = counter_clone.clone();
                async move {
                    let attempt = c.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err("transient error")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let policy = RetryPolicy::exponential(4, Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<i32, RetryError<&str>> = policy
            .execute(|| {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("persistent error")
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last_error, Some("persistent error"));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_runs_operation() {
        let policy = RetryPolicy::exponential(0, Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), RetryError<&str>> = policy
            .execute(|| {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 0);
        assert_eq!(err.last_error, None);
        assert_eq!(err.to_string(), "No attempts allowed");
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
