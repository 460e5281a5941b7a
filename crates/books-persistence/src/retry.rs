//! # Busy Retry
//!
//! Re-runs a whole unit of work when SQLite reports lock contention. The
//! unit must acquire its own session on every attempt, so a retried attempt
//! never observes partial effects of a failed one.

use std::future::Future;
use std::time::Duration;

use crate::error::{PersistenceError, Result};

/// Bounded exponential backoff for busy/locked failures.
///
/// Attempt `n` (0-based) that fails busy is followed by a sleep of
/// `initial_delay * backoff_factor^n`, except after the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor,
        }
    }

    /// Policy that never retries
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    /// Sleep after the given failed attempt (0-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(self.backoff_factor.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds, fails with something other than busy, or
    /// the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Non-busy errors are returned unchanged from the attempt that raised
    /// them. Busy on the final attempt becomes
    /// [`PersistenceError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_busy() => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        tracing::error!(
                            operation,
                            attempts = attempt,
                            error = %err,
                            "Database still busy, giving up"
                        );
                        return Err(PersistenceError::RetriesExhausted {
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                    }

                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Database busy, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Database, DatabaseConfig};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 2)
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert!(policy.delay_for(64) > policy.delay_for(2));
    }

    #[tokio::test]
    async fn test_busy_then_success_has_no_duplicate_effects() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(DatabaseConfig::new(
            dir.path().join("books.db").to_string_lossy(),
        ))
        .await
        .unwrap();
        let attempts = AtomicU32::new(0);
        let (db_ref, attempts_ref) = (&db, &attempts);

        fast_policy()
            .run("insert_book", move || async move {
                let n = attempts_ref.fetch_add(1, Ordering::SeqCst);
                let mut session = db_ref.acquire_session().await?;
                let result = sqlx::query(
                    "INSERT INTO books (id, title, price, rating, availability, category) \
                     VALUES (1, 'Title', 1.0, 3, 1, 'Poetry')",
                )
                .execute(session.conn())
                .await
                .map(|_| ())
                .map_err(PersistenceError::from);
                // First attempt writes, then hits contention and is rolled back.
                let result = if n == 0 {
                    result.and(Err(PersistenceError::Busy("database is locked".into())))
                } else {
                    result
                };
                session.finish(result).await
            })
            .await
            .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;

        let err = fast_policy()
            .run("always_busy", move || async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(PersistenceError::Busy("database is locked".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err,
            PersistenceError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;

        let err = fast_policy()
            .run("bad_query", move || async move {
                attempts_ref.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(PersistenceError::InvalidQuery("syntax".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(err, PersistenceError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let err = RetryPolicy::none()
            .run("once", || async {
                Err::<(), _>(PersistenceError::Busy("locked".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::RetriesExhausted { attempts: 1, .. }
        ));
    }
}
