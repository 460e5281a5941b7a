//! Query strings and request bodies.

use books_analytics::{ExportFormat, MAX_FEATURE_SAMPLES};
use books_domain::{
    DEFAULT_PAGE_SIZE, DomainError, MAX_PAGE_SIZE, PageRequest, PriceRange, SearchQuery,
    validate_limit,
};
use books_pipeline::ImportMode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const fn default_page() -> u32 {
    1
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_top_rated_limit() -> u32 {
    10
}

const fn default_feature_limit() -> u32 {
    MAX_FEATURE_SAMPLES
}

const fn default_min_price() -> f64 {
    0.0
}

const fn default_max_price() -> f64 {
    100.0
}

/// `?page=1&page_size=20`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl TryFrom<PaginationParams> for PageRequest {
    type Error = DomainError;

    fn try_from(params: PaginationParams) -> Result<Self, Self::Error> {
        Self::new(params.page, params.page_size)
    }
}

/// `?title=&category=`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub category: Option<String>,
}

impl TryFrom<SearchParams> for SearchQuery {
    type Error = DomainError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        Self::new(params.title, params.category)
    }
}

/// `?limit=10`, at most 100
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TopRatedParams {
    #[serde(default = "default_top_rated_limit")]
    pub limit: u32,
}

impl TopRatedParams {
    pub fn limit(self) -> Result<u32, DomainError> {
        validate_limit(self.limit, MAX_PAGE_SIZE)
    }
}

/// `?min=0&max=100`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceRangeParams {
    #[serde(default = "default_min_price")]
    pub min: f64,
    #[serde(default = "default_max_price")]
    pub max: f64,
}

impl TryFrom<PriceRangeParams> for PriceRange {
    type Error = DomainError;

    fn try_from(params: PriceRangeParams) -> Result<Self, Self::Error> {
        Self::new(params.min, params.max)
    }
}

/// `?limit=1000`; bounds are checked by the analytics engine
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureParams {
    #[serde(default = "default_feature_limit")]
    pub limit: u32,
}

/// `?format=json|csv`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TrainingDataParams {
    #[serde(default)]
    pub format: ExportFormat,
}

/// `?mode=replace|skip_if_populated`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TriggerParams {
    #[serde(default)]
    pub mode: ImportMode,
}

/// OAuth2-style password login form
#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Scores produced by an external model
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionBatch {
    pub model_name: String,
    pub predictions: Vec<Prediction>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub book_id: i64,
    pub prediction_score: f64,
    pub model_version: String,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl PredictionBatch {
    /// # Errors
    ///
    /// [`DomainError::Validation`] for a blank model name or a score outside
    /// `0..=1`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.model_name.trim().is_empty() {
            return Err(DomainError::Validation("model_name must not be empty".into()));
        }
        if let Some(bad) = self
            .predictions
            .iter()
            .find(|p| !(0.0..=1.0).contains(&p.prediction_score))
        {
            return Err(DomainError::Validation(format!(
                "prediction_score for book {} must be between 0 and 1",
                bad.book_id
            )));
        }
        Ok(())
    }
}
