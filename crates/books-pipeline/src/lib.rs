//! # Book Catalog Pipeline
//!
//! Loads catalog data and keeps it fresh.
//!
//! ## Features
//!
//! - CSV reader with per-row validation
//! - Bulk import in skip-if-populated or replace mode, in one transaction
//! - Single-flight scrape/import/invalidate orchestrator with step timeouts

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod csv_import;
pub mod error;
pub mod import;
pub mod pipeline;

pub use csv_import::{parse_books, read_books};
pub use error::PipelineError;
pub use import::{ImportMode, ImportReport, import_books};
pub use pipeline::{
    CommandScrapeJob, CsvImportJob, ImportJob, PipelineConfig, PipelineOrchestrator,
    PipelineStage, PipelineState, PipelineStatus, RunOutcome, RunRecord, ScrapeJob,
};
