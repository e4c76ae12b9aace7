use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const BACKOFF_BASE_MS: u64 = 25;

/// Whether a database error is worth retrying
///
/// Covers pool exhaustion, dropped connections and the Postgres codes for
/// serialization failure (40001), deadlock (40P01) and lock timeout (55P03).
pub fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some("40001") | Some("40P01") | Some("55P03")
        ),
        _ => false,
    }
}

/// Runs `operation` up to `attempts` times while it fails transiently
///
/// Domain errors and non-transient database errors are returned as-is.
/// Exhausting the attempts yields `StoreUnavailable`.
pub async fn with_retry<T, F, Fut>(attempts: u32, operation: &str, mut f: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match f().await {
            Err(AppError::Database(e)) if is_transient(&e) => {
                if attempt >= attempts {
                    tracing::error!(operation, attempts, error = %e, "Store retries exhausted");
                    return Err(AppError::StoreUnavailable(format!("{}: {}", operation, e)));
                }

                tracing::warn!(operation, attempt, error = %e, "Transient store failure, retrying");
                tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt)))
                    .await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::PoolClosed));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result = with_retry(3, "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        })
        .await;

        tokio_test::assert_ok!(&result);
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_store_unavailable() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: AppResult<()> = with_retry(2, "apply", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        })
        .await;

        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let id = Uuid::new_v4();

        let result: AppResult<()> = with_retry(5, "get", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::SessionNotFound(id))
        })
        .await;

        tokio_test::assert_err!(&result);
        assert!(matches!(result, Err(AppError::SessionNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
