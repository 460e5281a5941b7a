//! Analytics engine over the catalog database.
//!
//! Aggregate statistics are served cache-first from the shared
//! [`StatsCache`](books_persistence::StatsCache); feature and export
//! requests always read the current catalog.

use books_domain::{Book, validate_limit};
use books_persistence::cache::{CATEGORY_STATS_KEY, OVERVIEW_KEY};
use books_persistence::{Database, RetryPolicy, SharedStatsCache, queries as db_queries};

use crate::error::Result;
use crate::features::{FeatureMatrix, build_features};
use crate::queries::{self, CategoryStatsReport, OverviewStats};
use crate::reports::TrainingDataReport;

/// Largest sample the feature endpoint returns
pub const MAX_FEATURE_SAMPLES: u32 = 1000;

/// Statistics, feature engineering and export over one database.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    db: Database,
    retry: RetryPolicy,
    cache: SharedStatsCache,
}

impl AnalyticsEngine {
    /// Create an engine sharing `cache` with the import pipeline.
    pub const fn new(db: Database, retry: RetryPolicy, cache: SharedStatsCache) -> Self {
        Self { db, retry, cache }
    }

    /// The cache this engine reads from
    pub const fn cache(&self) -> &SharedStatsCache {
        &self.cache
    }

    /// Catalog overview, served from cache when fresh.
    pub async fn overview(&self) -> Result<OverviewStats> {
        if let Some(cached) = self.cache.get_json(OVERVIEW_KEY).await? {
            tracing::debug!(key = OVERVIEW_KEY, "Stats cache hit");
            return Ok(cached);
        }

        let generation = self.cache.generation().await;
        let db = &self.db;
        let stats = self
            .retry
            .run("stats_overview", move || async move {
                let mut session = db.acquire_session().await?;
                let stats = queries::overview(&mut session).await;
                session.finish(stats).await
            })
            .await?;

        self.cache.set_json(OVERVIEW_KEY, &stats, generation).await?;
        Ok(stats)
    }

    /// Per-category statistics, served from cache when fresh.
    pub async fn category_stats(&self) -> Result<CategoryStatsReport> {
        if let Some(cached) = self.cache.get_json(CATEGORY_STATS_KEY).await? {
            tracing::debug!(key = CATEGORY_STATS_KEY, "Stats cache hit");
            return Ok(cached);
        }

        let generation = self.cache.generation().await;
        let db = &self.db;
        let report = self
            .retry
            .run("stats_categories", move || async move {
                let mut session = db.acquire_session().await?;
                let report = queries::category_stats(&mut session).await;
                session.finish(report).await
            })
            .await?;

        self.cache
            .set_json(CATEGORY_STATS_KEY, &report, generation)
            .await?;
        Ok(report)
    }

    /// Feature matrix for the first `limit` books (1..=1000).
    pub async fn ml_features(&self, limit: u32) -> Result<FeatureMatrix> {
        let limit = validate_limit(limit, MAX_FEATURE_SAMPLES)?;
        let books = self.load_books(Some(limit)).await?;
        Ok(build_features(&books))
    }

    /// The whole catalog as training data.
    pub async fn training_data(&self) -> Result<TrainingDataReport> {
        let books = self.load_books(None).await?;
        tracing::info!(rows = books.len(), "Exporting training data");
        Ok(TrainingDataReport::new(books))
    }

    async fn load_books(&self, limit: Option<u32>) -> Result<Vec<Book>> {
        let db = &self.db;
        let books = self
            .retry
            .run("load_books", move || async move {
                let mut session = db.acquire_session().await?;
                let books = db_queries::books::all(&mut session, limit).await;
                session.finish(books).await
            })
            .await?;
        Ok(books)
    }
}
