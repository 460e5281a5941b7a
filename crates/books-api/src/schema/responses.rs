//! Response bodies.

use books_domain::{Book, Page};
use books_pipeline::ImportMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub health: String,
}

/// `GET /api/v1/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub app_name: String,
    pub version: String,
    pub environment: String,
    pub database: String,
}

/// One page of the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookListResponse {
    pub books: Vec<Book>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl From<Page<Book>> for BookListResponse {
    fn from(page: Page<Book>) -> Self {
        Self {
            books: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

/// Acknowledgement of a prediction batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionAck {
    pub status: String,
    pub message: String,
    pub predictions_received: usize,
    pub model_name: String,
}

/// `202 Accepted` body of a pipeline trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    pub run_id: Uuid,
    pub mode: ImportMode,
    pub triggered_by: String,
}
