//! Centralized retry with exponential backoff
//!
//! [`RetryingAccessor`] wraps a [`TableAccessor`] and re-attempts operations
//! that failed with a transient error (see [`AccessorError::is_retryable`]).
//! Creates are only re-sent when the failed attempt never reached Airtable
//! (throttled, or the connection could not be opened). Callers that want no
//! retries use the bare accessor or a policy with `max_attempts = 1`.

use crate::accessor::TableAccessor;
use crate::error::{AccessorError, AccessorResult};
use crate::record::{DeletedRecord, ListQuery, Record};
use crate::Fields;
use std::future::Future;
use std::time::Duration;
use yobot_common::config::RetryConfig;

/// Backoff schedule for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, given the error of attempt `attempt`
    ///
    /// Doubles from `initial_backoff`; a Retry-After hint raises the delay to
    /// at least the hinted value. Always capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32, error: &AccessorError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let mut delay = self.initial_backoff.saturating_mul(1u32 << exponent);

        if let AccessorError::RateLimited {
            retry_after: Some(hint),
            ..
        } = error
        {
            delay = delay.max(*hint);
        }

        delay.min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, op: F) -> AccessorResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AccessorResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    let delay = self.backoff(attempt, &e);
                    tracing::warn!(
                        table = e.table().unwrap_or("-"),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying Airtable request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Table accessor with centralized retry
#[derive(Debug, Clone)]
pub struct RetryingAccessor {
    inner: TableAccessor,
    policy: RetryPolicy,
}

impl RetryingAccessor {
    pub fn new(inner: TableAccessor, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Underlying accessor (no retries)
    pub fn inner(&self) -> &TableAccessor {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn create_record(&self, logical_name: &str, data: &Fields) -> AccessorResult<Record> {
        self.policy
            .run(|| self.inner.create_record(logical_name, data))
            .await
    }

    /// Batch create. A retry re-sends the whole batch, so batches spanning
    /// several chunks are never retried: earlier chunks may already be written.
    pub async fn create_records(
        &self,
        logical_name: &str,
        data: &[Fields],
    ) -> AccessorResult<Vec<Record>> {
        if data.len() > crate::accessor::MAX_BATCH_SIZE {
            return self.inner.create_records(logical_name, data).await;
        }
        self.policy
            .run(|| self.inner.create_records(logical_name, data))
            .await
    }

    pub async fn update_record(
        &self,
        logical_name: &str,
        record_id: &str,
        data: &Fields,
    ) -> AccessorResult<Record> {
        self.policy
            .run(|| self.inner.update_record(logical_name, record_id, data))
            .await
    }

    pub async fn get_record(&self, logical_name: &str, record_id: &str) -> AccessorResult<Record> {
        self.policy
            .run(|| self.inner.get_record(logical_name, record_id))
            .await
    }

    pub async fn delete_record(
        &self,
        logical_name: &str,
        record_id: &str,
    ) -> AccessorResult<DeletedRecord> {
        self.policy
            .run(|| self.inner.delete_record(logical_name, record_id))
            .await
    }

    pub async fn list_records(
        &self,
        logical_name: &str,
        view: Option<&str>,
        filter_formula: Option<&str>,
    ) -> AccessorResult<Vec<Record>> {
        self.policy
            .run(|| self.inner.list_records(logical_name, view, filter_formula))
            .await
    }

    pub async fn list_records_with(
        &self,
        logical_name: &str,
        query: &ListQuery,
    ) -> AccessorResult<Vec<Record>> {
        self.policy
            .run(|| self.inner.list_records_with(logical_name, query))
            .await
    }

    pub async fn find_first(
        &self,
        logical_name: &str,
        filter_formula: &str,
    ) -> AccessorResult<Option<Record>> {
        self.policy
            .run(|| self.inner.find_first(logical_name, filter_formula))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        }
    }

    fn timeout_error() -> AccessorError {
        AccessorError::Timeout {
            table: "leads".into(),
            operation: Operation::List,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy();
        let err = timeout_error();
        assert_eq!(policy.backoff(1, &err), Duration::from_millis(100));
        assert_eq!(policy.backoff(2, &err), Duration::from_millis(200));
        assert_eq!(policy.backoff(3, &err), Duration::from_millis(400));
        assert_eq!(policy.backoff(5, &err), Duration::from_secs(1));
        assert_eq!(policy.backoff(40, &err), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_honors_retry_after() {
        let policy = policy();
        let err = AccessorError::RateLimited {
            table: "leads".into(),
            operation: Operation::Create,
            body: String::new(),
            retry_after: Some(Duration::from_millis(700)),
        };
        assert_eq!(policy.backoff(1, &err), Duration::from_millis(700));

        let err = AccessorError::RateLimited {
            table: "leads".into(),
            operation: Operation::Create,
            body: String::new(),
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(policy.backoff(1, &err), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = policy()
            .run(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(timeout_error())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AccessorResult<()> = policy()
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout_error())
            })
            .await;

        assert!(matches!(result, Err(AccessorError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AccessorResult<()> = policy()
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AccessorError::Configuration("unknown logical table 'x'".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: AccessorResult<()> = RetryPolicy::none()
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(timeout_error())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
