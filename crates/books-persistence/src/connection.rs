//! # Connection Manager
//!
//! Owns the SQLite connection pool for the lifetime of the process. All
//! concurrency pragmas are part of the connect options, so sqlx applies them
//! to every physical connection the pool opens, not just the first one.

use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PersistenceError, Result};

/// The request path and the background logger each need a connection.
const MIN_POOL_SIZE: u32 = 2;

/// SQLite connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub database_path: PathBuf,

    /// Maximum number of pooled connections. Must cover peak request
    /// concurrency plus the background logger's session.
    pub max_connections: u32,

    /// Idle connections kept open
    pub min_connections: u32,

    /// How long a session acquisition waits for a free connection
    pub acquire_timeout: Duration,

    /// How long a statement waits for a database lock before reporting busy
    pub busy_timeout: Duration,

    pub journal_mode: SqliteJournalMode,

    pub synchronous: SqliteSynchronous,

    pub foreign_keys: bool,

    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/books.db"),
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(30),
            journal_mode: SqliteJournalMode::Wal,
            synchronous: SqliteSynchronous::Normal,
            foreign_keys: true,
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for the given location. A `sqlite://` or `sqlite:`
    /// URL prefix is accepted and stripped.
    pub fn new(location: impl AsRef<str>) -> Self {
        let location = location.as_ref();
        let path = location
            .strip_prefix("sqlite://")
            .or_else(|| location.strip_prefix("sqlite:"))
            .unwrap_or(location);

        Self {
            database_path: PathBuf::from(path),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    #[must_use]
    pub const fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections < MIN_POOL_SIZE {
            return Err(PersistenceError::Configuration(format!(
                "max_connections must be at least {MIN_POOL_SIZE}, got {}",
                self.max_connections
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(PersistenceError::Configuration(
                "min_connections cannot exceed max_connections".into(),
            ));
        }
        Ok(())
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(self.create_if_missing)
            .journal_mode(self.journal_mode)
            .synchronous(self.synchronous)
            .busy_timeout(self.busy_timeout)
            .foreign_keys(self.foreign_keys)
            .disable_statement_logging()
    }
}

/// Process-wide handle to the connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open the pool and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is inconsistent, the file cannot be
    /// opened or created, or migrations fail. Callers treat this as fatal.
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.database_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Configuration(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await?;

        tracing::info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            busy_timeout_ms = u64::try_from(config.busy_timeout.as_millis()).unwrap_or(u64::MAX),
            journal_mode = ?config.journal_mode,
            "SQLite pool opened"
        );

        let db = Self {
            pool,
            path: config.database_path,
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply pending schema migrations. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Underlying pool, for code that manages its own transactions
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify a connection can be acquired and used
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to come back
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
