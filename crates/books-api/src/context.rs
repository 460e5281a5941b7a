//! # Application State
//!
//! Shared dependencies handed to every handler. Repositories sit behind
//! trait objects so tests can swap in doubles.

use std::sync::Arc;

use books_analytics::AnalyticsEngine;
use books_persistence::cache::shared_cache;
use books_persistence::{
    AuditLogger, BookRepository, Database, SqliteBookRepository, SqliteUserRepository,
    UserRepository,
};
use books_pipeline::{CommandScrapeJob, CsvImportJob, PipelineOrchestrator};

use crate::auth::TokenKeys;
use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Used directly only by the health check
    pub db: Database,

    pub books: Arc<dyn BookRepository>,

    pub users: Arc<dyn UserRepository>,

    pub analytics: AnalyticsEngine,

    pub pipeline: PipelineOrchestrator,

    pub audit: AuditLogger,

    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    /// Wire the SQLite-backed services. The stats cache is shared between
    /// the analytics engine and the pipeline so a successful import
    /// invalidates what the stats endpoints serve.
    pub fn new(config: Config, db: Database, audit: AuditLogger) -> Self {
        let retry = config.retry;
        let cache = shared_cache(config.stats_cache_ttl);

        let analytics = AnalyticsEngine::new(db.clone(), retry, cache.clone());
        let pipeline = PipelineOrchestrator::new(
            Arc::new(CommandScrapeJob::new(
                config.pipeline.scraper_command.as_deref(),
            )),
            Arc::new(CsvImportJob::new(
                db.clone(),
                retry,
                config.pipeline.csv_path.clone(),
            )),
            cache,
            config.pipeline_config(),
        );

        Self {
            books: Arc::new(SqliteBookRepository::new(db.clone(), retry)),
            users: Arc::new(SqliteUserRepository::new(db.clone(), retry)),
            tokens: Arc::new(TokenKeys::from_settings(&config.auth)),
            config: Arc::new(config),
            db,
            analytics,
            pipeline,
            audit,
        }
    }

    #[must_use]
    pub fn with_book_repository(mut self, books: Arc<dyn BookRepository>) -> Self {
        self.books = books;
        self
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineOrchestrator) -> Self {
        self.pipeline = pipeline;
        self
    }
}
