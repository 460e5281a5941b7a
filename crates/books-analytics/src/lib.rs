//! # Book Catalog Analytics
//!
//! Read-side analytics over the catalog database.
//!
//! ## Features
//!
//! - Catalog overview and per-category statistics (cache-first)
//! - ML feature engineering (normalisation, one-hot encoding, bucketing)
//! - Training-data export as JSON or CSV

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs)]

pub mod engine;
pub mod error;
pub mod features;
pub mod queries;
pub mod reports;

pub use engine::{AnalyticsEngine, MAX_FEATURE_SAMPLES};
pub use error::AnalyticsError;
pub use features::{AvailabilityBucket, FeatureMatrix, FeatureVector};
pub use queries::{CategoryStats, CategoryStatsReport, OverviewStats};
pub use reports::{ExportFormat, TrainingDataReport, csv_file_name};
