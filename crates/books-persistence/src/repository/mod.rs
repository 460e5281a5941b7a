//! # Repository Module
//!
//! Repository pattern implementations for domain entity persistence.

pub mod sqlite_impl;
pub mod traits;

pub use sqlite_impl::{SqliteBookRepository, SqliteUserRepository};
pub use traits::{BookRepository, UserRepository};
