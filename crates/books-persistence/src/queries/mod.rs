//! # Domain Queries
//!
//! Stateless read/write operations. Every function runs on a caller-provided
//! [`ScopedSession`](crate::session::ScopedSession) and neither commits nor
//! retries; the caller decides the transaction boundary and the retry
//! policy. `NotFound` and validation failures propagate unchanged.

pub mod api_logs;
pub mod books;
pub mod users;
