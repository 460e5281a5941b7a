//! Analytics error types.

use books_persistence::PersistenceError;
use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Storage or cache failure
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Data conversion error
    #[error("Data conversion error: {0}")]
    Conversion(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<books_domain::DomainError> for AnalyticsError {
    fn from(err: books_domain::DomainError) -> Self {
        Self::InvalidParameter(err.to_string())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
