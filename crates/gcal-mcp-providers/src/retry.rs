//! Retry with exponential backoff for transient API failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ProviderResult;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate backoff duration for a given attempt (0-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let backoff = Duration::from_millis(backoff_ms.min(u64::MAX as f64) as u64);
        std::cmp::min(backoff, self.max_backoff)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut op: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let backoff = config.backoff_for_attempt(attempt);
                warn!(
                    operation,
                    code = %err.code(),
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    "request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let config = RetryConfig {
            max_backoff: Duration::from_millis(500),
            ..Default::default()
        };
        assert_eq!(config.backoff_for_attempt(10), Duration::from_millis(500));
        assert_eq!(
            RetryConfig::default().backoff_for_attempt(200),
            Duration::from_secs(10)
        );
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let calls = &AtomicU32::new(0);
        let result = with_retry(&fast(), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::server("boom"))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let result: ProviderResult<()> = with_retry(&fast(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::rate_limited("slow down"))
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: ProviderResult<()> = with_retry(&fast(), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::not_found("gone"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_retry_config_runs_once() {
        let calls = &AtomicU32::new(0);
        let config = RetryConfig::no_retry();
        let _: ProviderResult<()> = with_retry(&config, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::network("down"))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
