//! Persistence layer error types

use books_domain::DomainError;
use thiserror::Error;

/// SQLite primary result codes for lock contention
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Any storage failure that is not lock contention
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Transient lock contention; safe to retry the whole unit of work
    #[error("Database busy: {0}")]
    Busy(String),

    /// Lock contention that outlasted the retry budget
    #[error("Database still busy after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Entity not found: {entity_type} with key {key}")]
    NotFound { entity_type: String, key: String },

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PersistenceError {
    /// Whether this is a first-hand busy/locked failure that the retry
    /// policy may re-run.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Busy on a single attempt or after exhausting retries
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::RetriesExhausted { .. })
    }

    pub fn not_found(entity_type: &str, key: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        }
    }
}

/// Whether a driver error is SQLite lock contention.
///
/// SQLite reports extended result codes (e.g. `SQLITE_BUSY_SNAPSHOT` = 517);
/// the low byte carries the primary code. A pool acquire timeout is the
/// same condition one level up: every connection is held by other work.
pub(crate) fn is_sqlite_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            let busy_code = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED));
            busy_code || db_err.message().contains("database is locked")
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        if is_sqlite_contention(&err) {
            Self::Busy(err.to_string())
        } else {
            Self::Database(err)
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<DomainError> for PersistenceError {
    fn from(err: DomainError) -> Self {
        Self::InvalidQuery(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
