//! Write retries for a contended SQLite file

use crate::Result;
use std::time::Duration;
use tokio::time::Instant;

const FIRST_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(1000);

/// Run `write` until it succeeds, fails with a non-busy error, or `budget`
/// has been spent waiting on a busy database
///
/// Backoff doubles from 10ms up to 1s. The last busy error is returned
/// unchanged so callers can still classify it.
pub async fn retry_on_lock<F, Fut, T>(label: &str, budget: Duration, mut write: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let deadline = Instant::now() + budget;
    let mut backoff = FIRST_BACKOFF;
    let mut attempt = 1u32;

    loop {
        let err = match write().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(write = label, attempt, "Write went through after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_database_busy() => err,
            Err(err) => return Err(err),
        };

        if Instant::now() + backoff > deadline {
            tracing::error!(write = label, attempt, budget_ms = budget.as_millis() as u64, "Database stayed busy, giving up");
            return Err(err);
        }

        tracing::warn!(write = label, attempt, backoff_ms = backoff.as_millis() as u64, "Database busy, retrying");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_first_success_is_returned() {
        let value = retry_on_lock("insert", Duration::from_secs(5), || async { Ok::<_, Error>(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_on_lock("insert", Duration::from_secs(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(Error::Internal("constraint".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_pool_is_retried_until_free() {
        let calls = AtomicU32::new(0);
        let value = retry_on_lock("update", Duration::from_secs(5), || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(Error::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(call)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_error_surfaces_after_budget() {
        let calls = AtomicU32::new(0);
        let result = retry_on_lock("update", Duration::from_millis(50), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::Database(sqlx::Error::PoolTimedOut)) }
        })
        .await;

        assert!(matches!(result, Err(Error::Database(sqlx::Error::PoolTimedOut))));
        // 10 + 20 ms of backoff fit, the next 40 ms would overshoot
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
