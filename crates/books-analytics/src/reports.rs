//! Training-data export.

use books_domain::Book;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Columns usable as model inputs
pub const FEATURE_COLUMNS: [&str; 4] = ["id", "price", "availability", "category"];

/// Column to predict
pub const TARGET_VARIABLE: &str = "rating";

/// Export format for training data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// JSON document with metadata
    #[default]
    Json,
    /// CSV file, one row per book
    Csv,
}

/// Complete dataset for model training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataReport {
    /// Every book with its original values
    pub data: Vec<Book>,
    /// Number of rows
    pub total_samples: usize,
    /// Input columns
    pub features: Vec<String>,
    /// Target column
    pub target_variable: String,
    /// Human-readable summary
    pub description: String,
}

impl TrainingDataReport {
    /// Wrap the catalog rows with training metadata.
    pub fn new(data: Vec<Book>) -> Self {
        Self {
            total_samples: data.len(),
            data,
            features: FEATURE_COLUMNS.map(String::from).to_vec(),
            target_variable: TARGET_VARIABLE.to_string(),
            description: "Complete dataset for training ML models. Rating can be used as \
                          target for regression/classification."
                .to_string(),
        }
    }

    /// Render the rows as CSV with a header line.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for book in &self.data {
            writer.serialize(book)?;
        }
        if self.data.is_empty() {
            writer.write_record([
                "id",
                "title",
                "price",
                "rating",
                "availability",
                "category",
                "image_url",
            ])?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AnalyticsError::Conversion(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AnalyticsError::Conversion(e.to_string()))
    }
}

/// Attachment file name for a CSV export made on `date`.
pub fn csv_file_name(date: NaiveDate) -> String {
    format!("books_training_data_{}.csv", date.format("%Y%m%d"))
}
