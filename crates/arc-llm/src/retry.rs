//! Bounded retry with exponential backoff and jitter.
//!
//! Grounded on the CLI's `error_recovery::retry_with_backoff` +
//! `RetryConfig`, generalized with jitter (the source version has none;
//! spec.md's retry policy calls for it explicitly) so retries from many
//! concurrent sessions don't all wake up on the same tick.

use std::time::Duration;

use arc_core::{LlmError, LlmResult};
use rand::Rng;

/// Retry policy for transient LLM failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        let raw_ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_ms = raw_ms.min(self.max_delay.as_millis() as f64);
        let jitter = rand::rng().random_range(0.5..=1.0);
        Duration::from_millis((capped_ms * jitter) as u64)
    }
}

/// Run `operation` up to `config.max_attempts` times. Retries only on
/// `LlmError::is_retryable()`; fatal errors (auth, permanent 4xx) return
/// immediately on the first attempt.
pub async fn retry_with_backoff<F, Fut, T>(config: RetryConfig, mut operation: F) -> LlmResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = LlmResult<T>>,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "llm call succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !error.is_retryable() {
                    tracing::error!(error = %error, "llm call failed fatally, not retrying");
                    return Err(error);
                }
                tracing::warn!(attempt, error = %error, "llm call failed, will retry");
                let is_last = attempt == config.max_attempts;
                if !is_last {
                    tokio::time::sleep(config.delay_for(attempt)).await;
                }
                last_error = Some(error);
            }
        }
    }

    Err(last_error.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(RetryConfig::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, LlmError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_up_to_max_attempts() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), ..Default::default() };
        let result: LlmResult<i32> = retry_with_backoff(config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Timeout) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: LlmResult<i32> = retry_with_backoff(RetryConfig::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Fatal("bad api key".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), ..Default::default() };
        let result = retry_with_backoff(config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LlmError::Timeout)
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
