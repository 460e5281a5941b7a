//! # Request and Response Schema
//!
//! Wire types for the REST endpoints. Domain entities ([`Book`],
//! [`User`], statistics reports) are serialized as-is; this module holds the
//! query/body parameters and the response envelopes around them.
//!
//! [`Book`]: books_domain::Book
//! [`User`]: books_domain::User

pub mod params;
pub mod responses;

pub use params::*;
pub use responses::*;
