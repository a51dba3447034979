//! Bounded retry around a [`Classifier`].
//!
//! Up to `max_attempts` calls are made. Only failures flagged retryable are
//! retried; the delay before attempt `n + 1` is `backoff_step * n`. The last
//! failure is returned unchanged once attempts run out.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::classifier::{Classification, Classifier};
use crate::config::RequestConfig;
use crate::error::ServiceResult;

/// Retry bound and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total calls allowed, including the first
    pub max_attempts: u32,
    /// Linear backoff unit
    pub backoff_step: Duration,
}

impl RetryConfig {
    /// Delay before attempt `attempt + 1`.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RequestConfig::default())
    }
}

impl From<&RequestConfig> for RetryConfig {
    fn from(config: &RequestConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_step: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Snapshot of the in-flight call's progress, e.g. for "retrying... (2/3)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// 1-based attempt in progress
    pub attempt: u32,
    /// Configured bound
    pub max_attempts: u32,
}

/// Wraps a classifier with bounded linear-backoff retry
pub struct RetryPolicy<C> {
    classifier: C,
    config: RetryConfig,
    attempt: AtomicU32,
}

impl<C: Classifier> RetryPolicy<C> {
    /// Wrap `classifier` with the given schedule.
    pub fn new(classifier: C, config: RetryConfig) -> Self {
        Self {
            classifier,
            config,
            attempt: AtomicU32::new(0),
        }
    }

    /// Active retry configuration.
    pub fn config(&self) -> RetryConfig {
        self.config
    }

    /// Attempt number of the current (or last) top-level call; 0 before any call.
    pub fn current_attempt(&self) -> u32 {
        self.attempt.load(Ordering::SeqCst)
    }

    /// Current attempt paired with the bound.
    pub fn state(&self) -> RetryState {
        RetryState {
            attempt: self.current_attempt(),
            max_attempts: self.config.max_attempts,
        }
    }

    /// Classify `text`, retrying transient failures.
    pub async fn with_retry(&self, text: &str) -> ServiceResult<Classification> {
        self.attempt.store(0, Ordering::SeqCst);
        let mut attempt = 1;

        loop {
            self.attempt.store(attempt, Ordering::SeqCst);
            debug!(attempt, max_attempts = self.config.max_attempts, "Classification attempt");

            let err = match self.classifier.classify(text).await {
                Ok(classification) => return Ok(classification),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= self.config.max_attempts {
                return Err(err);
            }

            let delay = self.config.backoff_after(attempt);
            warn!(
                error = %err,
                attempt,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis(),
                "Retrying classification"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{MockClassifier, Sentiment};
    use crate::error::ServiceError;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1),
        }
    }

    fn positive() -> Classification {
        Classification::new(Sentiment::Positive, 0.97)
    }

    #[test]
    fn test_backoff_schedule_is_linear() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_after(1), Duration::from_millis(1000));
        assert_eq!(config.backoff_after(2), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mut mock = MockClassifier::new();
        mock.expect_classify().times(1).returning(|_| Ok(positive()));

        let policy = RetryPolicy::new(mock, fast_config());
        let result = policy.with_retry("I love this!").await.unwrap();

        assert_eq!(result.sentiment, Sentiment::Positive);
        assert_eq!(policy.current_attempt(), 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_retried_until_success() {
        let mut mock = MockClassifier::new();
        let mut calls = 0;
        mock.expect_classify().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(ServiceError::Timeout { timeout_ms: 10 })
            } else {
                Ok(positive())
            }
        });

        let policy = RetryPolicy::new(mock, fast_config());
        let result = policy.with_retry("hello").await;

        assert!(result.is_ok());
        assert_eq!(policy.current_attempt(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_single_attempt() {
        let mut mock = MockClassifier::new();
        mock.expect_classify()
            .times(1)
            .returning(|_| Err(ServiceError::from_status(400, "text too long")));

        let policy = RetryPolicy::new(mock, fast_config());
        let err = policy.with_retry("hello").await.unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(err.detail(), "text too long");
        assert_eq!(policy.current_attempt(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_failure() {
        let mut mock = MockClassifier::new();
        let mut calls = 0u16;
        mock.expect_classify().times(3).returning(move |_| {
            calls += 1;
            Err(ServiceError::from_status(500 + calls, format!("failure {}", calls)))
        });

        let policy = RetryPolicy::new(mock, fast_config());
        let err = policy.with_retry("hello").await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(err.detail(), "failure 3");
        assert!(matches!(err, ServiceError::Server { status: 503, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let mut mock = MockClassifier::new();
        mock.expect_classify()
            .times(3)
            .returning(|_| Err(ServiceError::Timeout { timeout_ms: 10 }));

        let policy = RetryPolicy::new(mock, RetryConfig::default());
        let start = tokio::time::Instant::now();
        let _ = policy.with_retry("hello").await;

        // 1000ms before attempt 2, 2000ms before attempt 3
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert!(start.elapsed() < Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_attempt_counter_resets_per_call() {
        let mut mock = MockClassifier::new();
        let mut calls = 0;
        mock.expect_classify().times(3).returning(move |_| {
            calls += 1;
            match calls {
                1 => Err(ServiceError::Timeout { timeout_ms: 10 }),
                _ => Ok(positive()),
            }
        });

        let policy = RetryPolicy::new(mock, fast_config());
        assert_eq!(policy.current_attempt(), 0);

        policy.with_retry("first").await.unwrap();
        assert_eq!(policy.current_attempt(), 2);

        policy.with_retry("second").await.unwrap();
        assert_eq!(policy.state(), RetryState { attempt: 1, max_attempts: 3 });
    }
}
