//! Bounded store calls.
//!
//! Every store call made by the engine goes through `RetryPolicy::call`:
//! each attempt has a deadline, and only transient failures are repeated.

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Deadline of a single attempt
    pub timeout: Duration,

    /// Total attempts, including the first one
    pub attempts: u32,

    /// Pause before attempt `n + 1` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_millis(config.store_timeout_ms),
            attempts: config.store_retry_attempts.max(1),
            backoff: Duration::from_millis(config.store_retry_backoff_ms),
        }
    }

    /// Run `call`, retrying transient failures.
    ///
    /// `operation` names the store call in logs and in timeout errors.
    pub async fn call<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(operation)),
            };

            match result {
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::debug!(operation, attempt, error = %e, "retrying store call");
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(50),
            attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let value = fast_policy()
            .call("test.flaky", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = fast_policy()
            .call("test.missing", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::MissingRecord(Uuid::nil()))
            })
            .await;

        assert!(matches!(result, Err(StoreError::MissingRecord(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_call_times_out_after_all_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = fast_policy()
            .call("test.slow", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(StoreError::Timeout("test.slow"))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
