//! Book catalog queries

use books_domain::{
    Book, CategoryCount, Page, PageRequest, PriceRange, SearchQuery, TOP_RATED_MIN_RATING,
};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::{PersistenceError, Result};
use crate::session::ScopedSession;

const BOOK_COLUMNS: &str = "id, title, price, rating, availability, category, image_url";

/// Rows per multi-row INSERT, well under SQLite's bound-parameter limit
const INSERT_CHUNK: usize = 500;

pub async fn count(session: &mut ScopedSession) -> Result<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(session.conn())
        .await?;
    Ok(total)
}

/// One page ordered by id. The total is counted separately, inside the same
/// transaction, so it is consistent with the page.
pub async fn list_page(session: &mut ScopedSession, request: PageRequest) -> Result<Page<Book>> {
    let total = count(session).await?;
    let books = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ? OFFSET ?"
    ))
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(session.conn())
    .await?;

    Ok(Page::new(books, total, request))
}

/// # Errors
///
/// [`PersistenceError::NotFound`] if no book has this id.
pub async fn get(session: &mut ScopedSession, book_id: i64) -> Result<Book> {
    sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
        .bind(book_id)
        .fetch_optional(session.conn())
        .await?
        .ok_or_else(|| PersistenceError::not_found("Book", book_id))
}

/// Case-insensitive title substring and/or exact category match
pub async fn search(session: &mut ScopedSession, query: &SearchQuery) -> Result<Vec<Book>> {
    let mut builder: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books WHERE 1 = 1"));

    if let Some(title) = query.title() {
        builder
            .push(" AND lower(title) LIKE lower(")
            .push_bind(format!("%{}%", escape_like(title)))
            .push(") ESCAPE '\\'");
    }
    if let Some(category) = query.category() {
        builder.push(" AND category = ").push_bind(category.to_string());
    }
    builder.push(" ORDER BY id");

    let books = builder
        .build_query_as::<Book>()
        .fetch_all(session.conn())
        .await?;
    Ok(books)
}

/// Books rated at least [`TOP_RATED_MIN_RATING`], best first, cheapest first
/// within a rating.
pub async fn top_rated(session: &mut ScopedSession, limit: u32) -> Result<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE rating >= ? \
         ORDER BY rating DESC, price ASC LIMIT ?"
    ))
    .bind(TOP_RATED_MIN_RATING)
    .bind(i64::from(limit))
    .fetch_all(session.conn())
    .await?;
    Ok(books)
}

/// Books priced within `range` (inclusive), cheapest first
pub async fn by_price_range(session: &mut ScopedSession, range: PriceRange) -> Result<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE price >= ? AND price <= ? ORDER BY price ASC"
    ))
    .bind(range.min())
    .bind(range.max())
    .fetch_all(session.conn())
    .await?;
    Ok(books)
}

/// Categories with their book counts, most populated first
pub async fn categories(session: &mut ScopedSession) -> Result<Vec<CategoryCount>> {
    let rows = sqlx::query_as::<_, CategoryCount>(
        "SELECT category, COUNT(id) AS count FROM books \
         GROUP BY category ORDER BY count DESC, category ASC",
    )
    .fetch_all(session.conn())
    .await?;
    Ok(rows)
}

/// Up to `limit` books ordered by id; `None` returns the whole catalog
pub async fn all(session: &mut ScopedSession, limit: Option<u32>) -> Result<Vec<Book>> {
    let limit = limit.map_or(-1, i64::from);
    let books = sqlx::query_as::<_, Book>(&format!(
        "SELECT {BOOK_COLUMNS} FROM books ORDER BY id LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(session.conn())
    .await?;
    Ok(books)
}

/// Insert books in multi-row statements. Fails on the first duplicate id.
pub async fn insert_batch(session: &mut ScopedSession, books: &[Book]) -> Result<u64> {
    let mut inserted = 0;

    for chunk in books.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO books (id, title, price, rating, availability, category, image_url) ",
        );
        builder.push_values(chunk, |mut row, book| {
            row.push_bind(book.id)
                .push_bind(&book.title)
                .push_bind(book.price)
                .push_bind(book.rating)
                .push_bind(book.availability)
                .push_bind(&book.category)
                .push_bind(&book.image_url);
        });
        inserted += builder.build().execute(session.conn()).await?.rows_affected();
    }

    Ok(inserted)
}

pub async fn delete_all(session: &mut ScopedSession) -> Result<u64> {
    let result = sqlx::query("DELETE FROM books")
        .execute(session.conn())
        .await?;
    Ok(result.rows_affected())
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Database, DatabaseConfig};
    use books_domain::fixtures::sample_books;
    use tempfile::TempDir;

    fn book(id: i64, title: &str, price: f64, rating: i32, category: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            price,
            rating,
            availability: 5,
            category: category.to_string(),
            image_url: None,
        }
    }

    async fn seeded_db(books: &[Book]) -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect(DatabaseConfig::new(
            dir.path().join("books.db").to_string_lossy(),
        ))
        .await
        .unwrap();
        let mut session = db.acquire_session().await.unwrap();
        insert_batch(&mut session, books).await.unwrap();
        session.commit().await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_list_page_counts_and_offsets() {
        let (_dir, db) = seeded_db(&sample_books(45)).await;
        let mut session = db.acquire_session().await.unwrap();

        let page = list_page(&mut session, PageRequest::new(3, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].id, 41);

        let beyond = list_page(&mut session, PageRequest::new(9, 20).unwrap())
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 45);
    }

    #[tokio::test]
    async fn test_get_missing_book_is_not_found() {
        let (_dir, db) = seeded_db(&sample_books(3)).await;
        let mut session = db.acquire_session().await.unwrap();

        assert_eq!(get(&mut session, 2).await.unwrap().id, 2);
        assert!(matches!(
            get(&mut session, 99).await,
            Err(PersistenceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_title_is_case_insensitive_substring() {
        let (_dir, db) = seeded_db(&[
            book(1, "A Light in the Attic", 51.77, 3, "Poetry"),
            book(2, "Tipping the Velvet", 53.74, 1, "Historical Fiction"),
            book(3, "The Attic Window", 10.0, 4, "Mystery"),
            book(4, "100% Attic", 12.0, 2, "Poetry"),
        ])
        .await;
        let mut session = db.acquire_session().await.unwrap();

        let q = SearchQuery::new(Some("ATTIC".into()), None).unwrap();
        let ids: Vec<i64> = search(&mut session, &q).await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);

        let q = SearchQuery::new(Some("attic".into()), Some("Poetry".into())).unwrap();
        let ids: Vec<i64> = search(&mut session, &q).await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 4]);

        // Wildcards in user input match literally.
        let q = SearchQuery::new(Some("0%".into()), None).unwrap();
        let ids: Vec<i64> = search(&mut session, &q).await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![4]);
    }

    #[tokio::test]
    async fn test_top_rated_ordering() {
        let (_dir, db) = seeded_db(&[
            book(1, "a", 30.0, 4, "Poetry"),
            book(2, "b", 20.0, 5, "Poetry"),
            book(3, "c", 10.0, 4, "Poetry"),
            book(4, "d", 5.0, 3, "Poetry"),
            book(5, "e", 25.0, 5, "Poetry"),
        ])
        .await;
        let mut session = db.acquire_session().await.unwrap();

        let ids: Vec<i64> = top_rated(&mut session, 10)
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![2, 5, 3, 1]);

        assert_eq!(top_rated(&mut session, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_price_range_is_inclusive() {
        let (_dir, db) = seeded_db(&[
            book(1, "a", 10.0, 3, "Poetry"),
            book(2, "b", 20.0, 3, "Poetry"),
            book(3, "c", 15.0, 3, "Poetry"),
            book(4, "d", 25.0, 3, "Poetry"),
        ])
        .await;
        let mut session = db.acquire_session().await.unwrap();

        let ids: Vec<i64> = by_price_range(&mut session, PriceRange::new(10.0, 20.0).unwrap())
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_categories_by_count_desc() {
        let (_dir, db) = seeded_db(&[
            book(1, "a", 1.0, 3, "Travel"),
            book(2, "b", 1.0, 3, "Poetry"),
            book(3, "c", 1.0, 3, "Poetry"),
            book(4, "d", 1.0, 3, "Mystery"),
            book(5, "e", 1.0, 3, "Poetry"),
            book(6, "f", 1.0, 3, "Mystery"),
        ])
        .await;
        let mut session = db.acquire_session().await.unwrap();

        let cats = categories(&mut session).await.unwrap();
        assert_eq!(
            cats,
            vec![
                CategoryCount { category: "Poetry".into(), count: 3 },
                CategoryCount { category: "Mystery".into(), count: 2 },
                CategoryCount { category: "Travel".into(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_insert_batch_spans_chunks_and_delete_all() {
        let (_dir, db) = seeded_db(&sample_books(1200)).await;
        let mut session = db.acquire_session().await.unwrap();

        assert_eq!(count(&mut session).await.unwrap(), 1200);
        assert_eq!(all(&mut session, Some(10)).await.unwrap().len(), 10);
        assert_eq!(all(&mut session, None).await.unwrap().len(), 1200);

        assert_eq!(delete_all(&mut session).await.unwrap(), 1200);
        assert_eq!(count(&mut session).await.unwrap(), 0);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
