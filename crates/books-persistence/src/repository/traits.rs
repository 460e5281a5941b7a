//! # Repository Traits
//!
//! Abstract repository interfaces for domain entities.
//! Implementations can be swapped for different backends (SQLite, mock, etc.)

use async_trait::async_trait;

use crate::error::Result;
use books_domain::{
    Book, CategoryCount, NewUser, Page, PageRequest, PriceRange, SearchQuery, User,
};

// =============================================================================
// BOOK REPOSITORY
// =============================================================================

/// Read access to the book catalog
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// One page of books ordered by id
    async fn list(&self, request: PageRequest) -> Result<Page<Book>>;

    /// Get book by ID; `NotFound` if absent
    async fn get(&self, book_id: i64) -> Result<Book>;

    /// Title substring and/or category search
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Book>>;

    /// Highest rated books, cheapest first within a rating
    async fn top_rated(&self, limit: u32) -> Result<Vec<Book>>;

    /// Books in a price range, cheapest first
    async fn by_price_range(&self, range: PriceRange) -> Result<Vec<Book>>;

    /// Categories with book counts, most populated first
    async fn categories(&self) -> Result<Vec<CategoryCount>>;

    /// Books ordered by id, optionally capped
    async fn all(&self, limit: Option<u32>) -> Result<Vec<Book>>;

    async fn count(&self) -> Result<i64>;
}

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new account and return it with its assigned id
    async fn create(&self, user: &NewUser) -> Result<User>;
}
