//! Pipeline error types.

use std::time::Duration;

use books_persistence::PersistenceError;
use thiserror::Error;

use crate::pipeline::PipelineStage;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// An external step exited unsuccessfully
    #[error("{stage} step failed: {reason}")]
    StepFailed { stage: PipelineStage, reason: String },

    /// An external step outlived its time budget and was killed
    #[error("{stage} step timed out after {timeout:?}")]
    StepTimedOut { stage: PipelineStage, timeout: Duration },

    #[error("A pipeline run is already in progress")]
    AlreadyRunning,

    /// A CSV row that does not describe a valid book
    #[error("Invalid row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
