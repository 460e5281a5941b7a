//! # Book Catalog Persistence
//!
//! SQLite persistence layer tuned for many concurrent request tasks sharing
//! one database file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                        │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                   │
//!              ▼                                   ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────┐
//! │      Repository Traits       │   │      AuditLogger         │
//! │     (Book, User repos)       │   │ (bounded queue, worker)  │
//! └──────────────────────────────┘   └──────────────────────────┘
//!              │                                   │
//!              ▼                                   ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        RetryPolicy  ->  ScopedSession  ->  queries::*        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          Database (SqlitePool, WAL, busy_timeout)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use books_persistence::{
//!     AuditConfig, AuditLogger, BookRepository, Database, DatabaseConfig, RetryPolicy,
//!     SqliteBookRepository,
//! };
//!
//! let db = Database::connect(DatabaseConfig::new("data/books.db")).await?;
//! let books = SqliteBookRepository::new(db.clone(), RetryPolicy::default());
//! let (audit, worker) = AuditLogger::spawn(db.clone(), AuditConfig::default());
//!
//! let page = books.list(PageRequest::default()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audit;
pub mod cache;
pub mod connection;
pub mod error;
pub mod queries;
pub mod repository;
pub mod retry;
pub mod session;

// Re-export commonly used types
pub use audit::{AuditConfig, AuditLogger};
pub use cache::{SharedStatsCache, StatsCache};
pub use connection::{Database, DatabaseConfig};
pub use error::{PersistenceError, Result};
pub use repository::{
    BookRepository, SqliteBookRepository, SqliteUserRepository, UserRepository,
};
pub use retry::RetryPolicy;
pub use session::ScopedSession;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
