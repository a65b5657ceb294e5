//! Attempt loop with exponential backoff.
//!
//! `retries == 0` means a single attempt. Any positive value is the number of
//! attempts to make, capped by the policy's `max_attempts`. Between attempts
//! the task sleeps `delay`, `delay * factor`, `delay * factor^2`, ...

mod backoff;

use std::future::Future;

pub use backoff::{BackoffConfig, ExponentialBackoff};

use crate::error::PushError;
use crate::metrics::RetryMetrics;

/// Instance-scoped retry settings of a dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Number of attempts a send with `retries` will make.
    pub fn attempts_for(&self, retries: u32) -> u32 {
        if retries == 0 {
            1
        } else {
            retries.min(self.max_attempts).max(1)
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is used up. The last error is returned.
    ///
    /// `operation` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, retries: u32, mut operation: F) -> Result<T, PushError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PushError>>,
    {
        let attempts = self.attempts_for(retries);
        let mut backoff = ExponentialBackoff::with_config(self.backoff.clone());
        let mut attempt = 1;

        loop {
            RetryMetrics::attempt();

            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "Gateway request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Gateway attempt failed, backing off"
                    );
                    RetryMetrics::retry();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        RetryMetrics::exhausted();
                        tracing::warn!(attempts, error = %e, "Gateway attempts exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::GatewayError;
    use crate::transport::TransportError;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            BackoffConfig {
                initial_delay_ms: 1000,
                max_delay_ms: 60_000,
                multiplier: 1.2,
                jitter_factor: 0.0,
            },
        )
    }

    #[test]
    fn test_attempts_for() {
        let policy = policy(10);
        assert_eq!(policy.attempts_for(0), 1);
        assert_eq!(policy.attempts_for(1), 1);
        assert_eq!(policy.attempts_for(3), 3);
        assert_eq!(policy.attempts_for(50), 10);
    }

    #[test]
    fn test_attempts_for_zero_max_still_attempts_once() {
        assert_eq!(policy(0).attempts_for(5), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result = policy(10)
            .run(3, |attempt| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(PushError::Transport(TransportError::Timeout))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms + 1200ms of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2200), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2210), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_last_error_when_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), PushError> = policy(10)
            .run(2, |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PushError::Gateway(GatewayError::ServiceUnavailable))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(PushError::Gateway(GatewayError::ServiceUnavailable))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_zero_retries_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = tokio::time::Instant::now();

        let result: Result<(), PushError> = policy(10)
            .run(0, |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PushError::Transport(TransportError::Connect("refused".into())))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_parse_errors() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), PushError> = policy(10)
            .run(5, |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PushError::Parse("not json".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(PushError::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
