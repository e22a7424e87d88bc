//! Background jobs - apalis workers and the queue they read from.
//!
//! Handlers retry transient failures a bounded number of times with
//! exponential backoff before giving the job back to apalis as failed.

mod confirmation_job;
mod email_job;
mod notification_job;
mod queue;

pub use confirmation_job::{confirmation_job_handler, ConfirmationJob};
pub use email_job::{email_job_handler, EmailJob, EmailWorkerContext};
pub use notification_job::{notification_job_handler, NotificationJob};
pub use queue::{connect_job_pool, ApalisQueue, JobQueue};

#[cfg(any(test, feature = "test-utils"))]
pub use queue::MockJobQueue;

use std::future::Future;
use std::time::Duration;

use crate::config::{JOB_BACKOFF_BASE_MS, JOB_MAX_ATTEMPTS};
use crate::errors::AppResult;

/// Run `op`, retrying transient errors up to `JOB_MAX_ATTEMPTS` times.
pub async fn retry_transient<T, F, Fut>(job: &str, op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    retry_with_backoff(job, JOB_MAX_ATTEMPTS, JOB_BACKOFF_BASE_MS, op).await
}

/// Retry with delays of `base_ms`, `2 * base_ms`, `4 * base_ms`...
pub async fn retry_with_backoff<T, F, Fut>(
    job: &str,
    max_attempts: u32,
    base_ms: u64,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay_ms = base_ms.saturating_mul(1 << (attempt - 1));
                tracing::warn!(
                    job,
                    attempt,
                    delay_ms,
                    error = %e,
                    "Transient job failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(job, attempt, error = %e, "Job failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff("test", 3, 1, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AppError::external("gateway down"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_with_backoff("test", 3, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::ConcurrentUpdate) }
        })
        .await;

        assert!(matches!(result, Err(AppError::ConcurrentUpdate)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_with_backoff("test", 3, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::NotFound) }
        })
        .await;

        assert!(matches!(result, Err(AppError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
