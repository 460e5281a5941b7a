//! Predefined aggregate queries over the catalog.

use books_persistence::{Result, ScopedSession};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Catalog-wide summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    /// Number of books in the catalog
    pub total_books: i64,
    /// Mean price, rounded to 2 decimals; 0 for an empty catalog
    pub average_price: f64,
    /// Book count per star rating; ratings with no books are absent
    pub rating_distribution: BTreeMap<i32, i64>,
    /// Number of distinct categories
    pub total_categories: i64,
}

/// Statistics for a single category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Category name
    pub category: String,
    /// Books in the category
    pub book_count: i64,
    /// Mean price, rounded to 2 decimals
    pub average_price: f64,
    /// Mean rating, rounded to 2 decimals
    pub average_rating: f64,
}

/// Per-category statistics, most populated category first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStatsReport {
    /// One entry per category
    pub categories: Vec<CategoryStats>,
    /// Number of categories
    pub total_categories: usize,
}

/// Round to 2 decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the overview in one session.
pub async fn overview(session: &mut ScopedSession) -> Result<OverviewStats> {
    let (total_books, average_price, total_categories): (i64, Option<f64>, i64) = sqlx::query_as(
        "SELECT COUNT(*), AVG(price), COUNT(DISTINCT category) FROM books",
    )
    .fetch_one(session.conn())
    .await?;

    let rating_distribution: Vec<(i32, i64)> = sqlx::query_as(
        "SELECT rating, COUNT(id) FROM books GROUP BY rating ORDER BY rating",
    )
    .fetch_all(session.conn())
    .await?;

    Ok(OverviewStats {
        total_books,
        average_price: average_price.map_or(0.0, round2),
        rating_distribution: rating_distribution.into_iter().collect(),
        total_categories,
    })
}

/// Compute per-category statistics in one session.
pub async fn category_stats(session: &mut ScopedSession) -> Result<CategoryStatsReport> {
    let rows: Vec<(String, i64, Option<f64>, Option<f64>)> = sqlx::query_as(
        "SELECT category, COUNT(id) AS book_count, AVG(price), AVG(rating) \
         FROM books GROUP BY category ORDER BY book_count DESC, category ASC",
    )
    .fetch_all(session.conn())
    .await?;

    let categories: Vec<CategoryStats> = rows
        .into_iter()
        .map(|(category, book_count, avg_price, avg_rating)| CategoryStats {
            category,
            book_count,
            average_price: avg_price.map_or(0.0, round2),
            average_rating: avg_rating.map_or(0.0, round2),
        })
        .collect();

    Ok(CategoryStatsReport {
        total_categories: categories.len(),
        categories,
    })
}
