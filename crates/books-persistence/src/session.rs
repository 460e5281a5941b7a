//! # Scoped Sessions
//!
//! A [`ScopedSession`] is one unit of database work: a pooled connection
//! with an open transaction, exclusively owned by the task that acquired it.
//!
//! Release happens exactly once on every exit path:
//!
//! - [`ScopedSession::commit`] / [`ScopedSession::rollback`] consume the
//!   session explicitly.
//! - [`ScopedSession::finish`] commits an `Ok` result and rolls back an
//!   `Err` before handing the result back.
//! - Dropping the session (early return, panic, request cancellation or
//!   timeout) rolls the transaction back and returns the connection to the
//!   pool.

use sqlx::{Sqlite, SqliteConnection, Transaction};

use crate::connection::Database;
use crate::error::Result;

/// Exclusive handle to one transactional unit of work.
#[derive(Debug)]
pub struct ScopedSession {
    tx: Transaction<'static, Sqlite>,
}

impl Database {
    /// Acquire a fresh session. Waits for a free pool slot up to the
    /// configured acquire timeout; a timeout surfaces as busy.
    ///
    /// Sessions are independent: acquiring one never waits on another
    /// session's transaction, only on pool capacity.
    pub async fn acquire_session(&self) -> Result<ScopedSession> {
        let tx = self.pool().begin().await?;
        Ok(ScopedSession { tx })
    }
}

impl ScopedSession {
    /// Connection to run statements on, inside this session's transaction
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commit and release
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Roll back and release
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Settle the session according to `result`: commit on `Ok`, roll back
    /// on `Err`. A failed commit replaces the `Ok`; a failed rollback is
    /// logged and the original error is kept.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        original_error = %err,
                        "Rollback failed; connection discarded"
                    );
                }
                Err(err)
            }
        }
    }
}
