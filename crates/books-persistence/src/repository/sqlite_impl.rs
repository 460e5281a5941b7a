//! SQLite repository implementation.
//!
//! Every call is one unit of work: a fresh [`ScopedSession`] per attempt,
//! committed on success and rolled back on error, with busy failures
//! re-run by the repository's [`RetryPolicy`].
//!
//! [`ScopedSession`]: crate::session::ScopedSession

use async_trait::async_trait;

use crate::connection::Database;
use crate::error::Result;
use crate::queries;
use crate::retry::RetryPolicy;
use crate::repository::traits::{BookRepository, UserRepository};
use books_domain::{
    Book, CategoryCount, NewUser, Page, PageRequest, PriceRange, SearchQuery, User,
};

/// Run `$body` on a fresh session under the repository's retry policy.
/// Captured arguments must be `Copy` since the body may run more than once.
macro_rules! unit_of_work {
    ($repo:expr, $operation:literal, |$session:ident| $body:expr) => {{
        let db = &$repo.db;
        $repo
            .retry
            .run($operation, move || async move {
                let mut $session = db.acquire_session().await?;
                let result = {
                    let $session = &mut $session;
                    $body
                }
                .await;
                $session.finish(result).await
            })
            .await
    }};
}

// =============================================================================
// BOOK REPOSITORY
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    db: Database,
    retry: RetryPolicy,
}

impl SqliteBookRepository {
    pub const fn new(db: Database, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn list(&self, request: PageRequest) -> Result<Page<Book>> {
        unit_of_work!(self, "list_books", |session| queries::books::list_page(
            session, request
        ))
    }

    async fn get(&self, book_id: i64) -> Result<Book> {
        unit_of_work!(self, "get_book", |session| queries::books::get(
            session, book_id
        ))
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Book>> {
        unit_of_work!(self, "search_books", |session| queries::books::search(
            session, query
        ))
    }

    async fn top_rated(&self, limit: u32) -> Result<Vec<Book>> {
        unit_of_work!(self, "top_rated_books", |session| {
            queries::books::top_rated(session, limit)
        })
    }

    async fn by_price_range(&self, range: PriceRange) -> Result<Vec<Book>> {
        unit_of_work!(self, "books_by_price_range", |session| {
            queries::books::by_price_range(session, range)
        })
    }

    async fn categories(&self) -> Result<Vec<CategoryCount>> {
        unit_of_work!(self, "list_categories", |session| {
            queries::books::categories(session)
        })
    }

    async fn all(&self, limit: Option<u32>) -> Result<Vec<Book>> {
        unit_of_work!(self, "all_books", |session| queries::books::all(
            session, limit
        ))
    }

    async fn count(&self) -> Result<i64> {
        unit_of_work!(self, "count_books", |session| queries::books::count(session))
    }
}

// =============================================================================
// USER REPOSITORY
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    db: Database,
    retry: RetryPolicy,
}

impl SqliteUserRepository {
    pub const fn new(db: Database, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        unit_of_work!(self, "find_user_by_username", |session| {
            queries::users::find_by_username(session, username)
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        unit_of_work!(self, "find_user_by_email", |session| {
            queries::users::find_by_email(session, email)
        })
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        let created = unit_of_work!(self, "create_user", |session| queries::users::insert(
            session, user
        ))?;
        tracing::info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }
}
