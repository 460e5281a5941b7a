//! # Book Catalog - Domain Model
//!
//! Core entities and value objects for the book catalog service. These types
//! are shared by every layer: persistence, analytics, import pipeline and the
//! HTTP API.
//!
//! Query value objects ([`PageRequest`], [`SearchQuery`], [`PriceRange`]) are
//! validated on construction, so an invalid request is rejected before any
//! storage access happens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "fixtures")]
pub mod fixtures;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Lowest valid star rating
pub const MIN_RATING: i32 = 1;

/// Highest valid star rating
pub const MAX_RATING: i32 = 5;

/// Books at or above this rating are considered "top rated"
pub const TOP_RATED_MIN_RATING: i32 = 4;

/// Default page size for book listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound for page sizes and result limits
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// ENTITIES
// =============================================================================

/// Book entity - one row of the catalog
///
/// Identity is assigned by the upstream data source, not by the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub rating: i32,
    pub availability: i64,
    pub category: String,
    pub image_url: Option<String>,
}

impl Book {
    /// Check the catalog invariants: rating in 1..=5, non-negative price
    /// and stock, non-empty title and category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidBook`] describing the first violation.
    pub fn validate(&self) -> Result<(), DomainError> {
        let invalid = |reason: &str| DomainError::InvalidBook {
            id: self.id,
            reason: reason.to_string(),
        };

        if self.title.trim().is_empty() {
            return Err(invalid("title must not be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(invalid("category must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(invalid("price must be a non-negative number"));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(invalid("rating must be between 1 and 5"));
        }
        if self.availability < 0 {
            return Err(invalid("availability must not be negative"));
        }
        Ok(())
    }
}

/// User account used for authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// User to be inserted (id and timestamp assigned by storage)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_admin: bool,
}

/// Persisted request audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ApiLog {
    pub id: i64,
    pub endpoint: String,
    pub method: String,
    pub status_code: i64,
    /// Milliseconds
    pub response_time: f64,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub query_params: Option<String>,
    pub error_message: Option<String>,
}

/// Audit record handed to the background logger
#[derive(Debug, Clone, PartialEq)]
pub struct NewApiLog {
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub query_params: Option<String>,
    pub error_message: Option<String>,
}

impl NewApiLog {
    /// Create a record stamped with the current time
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        status_code: u16,
        response_time_ms: f64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            status_code,
            response_time_ms,
            timestamp: Utc::now(),
            user_id: None,
            query_params: None,
            error_message: None,
        }
    }

    #[must_use]
    pub fn with_query_params(mut self, query_params: Option<String>) -> Self {
        self.query_params = query_params;
        self
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    #[must_use]
    pub fn with_error_message(mut self, error_message: Option<String>) -> Self {
        self.error_message = error_message;
        self
    }
}

// =============================================================================
// AGGREGATES
// =============================================================================

/// Category with its number of books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

// =============================================================================
// QUERY/FILTER TYPES
// =============================================================================

/// Validated pagination parameters (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// # Errors
    ///
    /// Rejects `page < 1` and page sizes outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Result<Self, DomainError> {
        if page < 1 {
            return Err(DomainError::Validation("page must be at least 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(DomainError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Row offset: `(page - 1) * page_size`
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results together with the overall count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page; `total_pages` is `ceil(total / page_size)`.
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let size = i64::from(request.page_size());
        let total = total.max(0);
        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
            total_pages: (total + size - 1) / size,
        }
    }
}

/// Title and/or category search; at least one criterion is required
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    title: Option<String>,
    category: Option<String>,
}

impl SearchQuery {
    /// Blank strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] when neither criterion is given.
    pub fn new(title: Option<String>, category: Option<String>) -> Result<Self, DomainError> {
        let title = title.filter(|t| !t.trim().is_empty());
        let category = category.filter(|c| !c.trim().is_empty());

        if title.is_none() && category.is_none() {
            return Err(DomainError::Validation(
                "at least one search parameter (title or category) must be provided".into(),
            ));
        }
        Ok(Self { title, category })
    }

    /// Case-insensitive substring to match against titles
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Exact category name
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Inclusive price range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl PriceRange {
    /// # Errors
    ///
    /// Rejects negative bounds and `min > max`.
    pub fn new(min: f64, max: f64) -> Result<Self, DomainError> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || max < 0.0 {
            return Err(DomainError::Validation(
                "price bounds must be non-negative numbers".into(),
            ));
        }
        if min > max {
            return Err(DomainError::Validation(
                "minimum price cannot be greater than maximum price".into(),
            ));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
        }
    }
}

/// Validate a result limit against an upper bound.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] when `limit` is outside `1..=max`.
pub fn validate_limit(limit: u32, max: u32) -> Result<u32, DomainError> {
    if (1..=max).contains(&limit) {
        Ok(limit)
    } else {
        Err(DomainError::Validation(format!(
            "limit must be between 1 and {max}"
        )))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid book {id}: {reason}")]
    InvalidBook { id: i64, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book {
            id: 1,
            title: "A Light in the Attic".to_string(),
            price: 51.77,
            rating: 3,
            availability: 22,
            category: "Poetry".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_book_validation() {
        assert!(book().validate().is_ok());

        let mut b = book();
        b.rating = 6;
        assert!(matches!(b.validate(), Err(DomainError::InvalidBook { id: 1, .. })));

        let mut b = book();
        b.price = -0.01;
        assert!(b.validate().is_err());

        let mut b = book();
        b.availability = -1;
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(0, 20).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());

        let req = PageRequest::new(3, 20).unwrap();
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        let req = PageRequest::new(1, 20).unwrap();
        assert_eq!(Page::<()>::new(vec![], 1000, req).total_pages, 50);
        assert_eq!(Page::<()>::new(vec![], 1001, req).total_pages, 51);
        assert_eq!(Page::<()>::new(vec![], 0, req).total_pages, 0);
        assert_eq!(Page::<()>::new(vec![], 1, req).total_pages, 1);
    }

    #[test]
    fn test_items_never_exceed_total() {
        // For every valid page shape, the rows before and on a page fit in `total`.
        for total in [0_i64, 1, 19, 20, 21, 999, 1000] {
            for size in [1_u32, 7, 20, 100] {
                let pages = Page::<()>::new(vec![], total, PageRequest::new(1, size).unwrap())
                    .total_pages;
                for page in 1..=u32::try_from(pages).unwrap().max(1) {
                    let req = PageRequest::new(page, size).unwrap();
                    let on_page = (total - req.offset()).clamp(0, req.limit());
                    assert!(req.offset() + on_page <= total);
                }
            }
        }
    }

    #[test]
    fn test_search_requires_a_criterion() {
        assert!(matches!(
            SearchQuery::new(None, None),
            Err(DomainError::Validation(_))
        ));
        assert!(SearchQuery::new(Some("  ".into()), None).is_err());

        let by_title = SearchQuery::new(Some("attic".into()), None).unwrap();
        assert_eq!(by_title.title(), Some("attic"));
        assert_eq!(by_title.category(), None);

        let by_category = SearchQuery::new(None, Some("Poetry".into())).unwrap();
        assert_eq!(by_category.category(), Some("Poetry"));
    }

    #[test]
    fn test_price_range_validation() {
        assert!(PriceRange::new(10.0, 5.0).is_err());
        assert!(PriceRange::new(-1.0, 5.0).is_err());
        assert!(PriceRange::new(5.0, 5.0).is_ok());
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "admin".into(),
            email: "admin@example.com".into(),
            hashed_password: "$2b$12$secret".into(),
            is_active: true,
            is_admin: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(10, MAX_PAGE_SIZE), Ok(10));
        assert!(validate_limit(0, MAX_PAGE_SIZE).is_err());
        assert!(validate_limit(101, MAX_PAGE_SIZE).is_err());
    }
}
