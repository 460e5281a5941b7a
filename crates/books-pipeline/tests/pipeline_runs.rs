//! End-to-end pipeline runs against a real database and stats cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use books_analytics::AnalyticsEngine;
use books_persistence::{Database, DatabaseConfig, RetryPolicy, cache::shared_cache};
use books_pipeline::{
    CsvImportJob, ImportMode, PipelineConfig, PipelineError, PipelineOrchestrator, PipelineStage,
    RunOutcome, ScrapeJob,
};

const HEADER: &str = "id,title,price,rating,availability,category,image_url\n";

/// Scraper that writes fixed CSV content to the import path
struct WritingScraper {
    path: std::path::PathBuf,
    content: String,
}

#[async_trait]
impl ScrapeJob for WritingScraper {
    async fn scrape(&self) -> Result<(), PipelineError> {
        tokio::fs::write(&self.path, &self.content).await?;
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    csv_path: std::path::PathBuf,
    db: Database,
    analytics: AnalyticsEngine,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("books.csv");
    let db = Database::connect(DatabaseConfig::new(
        dir.path().join("books.db").to_string_lossy(),
    ))
    .await
    .unwrap();
    let analytics = AnalyticsEngine::new(
        db.clone(),
        RetryPolicy::default(),
        shared_cache(Duration::from_secs(300)),
    );
    Fixture {
        _dir: dir,
        csv_path,
        db,
        analytics,
    }
}

fn pipeline(f: &Fixture, csv: String) -> PipelineOrchestrator {
    PipelineOrchestrator::new(
        Arc::new(WritingScraper {
            path: f.csv_path.clone(),
            content: csv,
        }),
        Arc::new(CsvImportJob::new(
            f.db.clone(),
            RetryPolicy::default(),
            f.csv_path.clone(),
        )),
        Arc::clone(f.analytics.cache()),
        PipelineConfig::default(),
    )
}

#[tokio::test]
async fn test_successful_run_refreshes_stats() {
    let f = fixture().await;

    let first = format!("{HEADER}1,One,10.0,3,1,Poetry,\n2,Two,20.0,4,1,Poetry,\n");
    pipeline(&f, first).run("admin", ImportMode::Replace).await.unwrap();
    assert_eq!(f.analytics.overview().await.unwrap().total_books, 2);

    let second = format!("{HEADER}1,One,10.0,3,1,Poetry,\n2,Two,20.0,4,1,Poetry,\n3,Three,30.0,5,1,Travel,\n");
    let record = pipeline(&f, second).run("admin", ImportMode::Replace).await.unwrap();

    assert!(matches!(record.outcome, Some(RunOutcome::Succeeded { .. })));
    let stats = f.analytics.overview().await.unwrap();
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.total_categories, 2);
}

#[tokio::test]
async fn test_failed_import_keeps_data_and_cache() {
    let f = fixture().await;

    let good = format!("{HEADER}1,One,10.0,3,1,Poetry,\n2,Two,20.0,4,1,Poetry,\n");
    pipeline(&f, good).run("admin", ImportMode::Replace).await.unwrap();
    let before = f.analytics.overview().await.unwrap();
    let invalidated_at = f.analytics.cache().last_invalidated().await;

    // The scrape succeeds but produces a row the import rejects.
    let bad = format!("{HEADER}1,One,10.0,3,1,Poetry,\n2,Broken,-5.0,4,1,Poetry,\n");
    let record = pipeline(&f, bad).run("admin", ImportMode::Replace).await.unwrap();

    assert!(matches!(
        record.outcome,
        Some(RunOutcome::Failed { stage: PipelineStage::Import, .. })
    ));
    assert_eq!(f.analytics.cache().last_invalidated().await, invalidated_at);
    assert_eq!(f.analytics.overview().await.unwrap(), before);
    assert_eq!(f.analytics.training_data().await.unwrap().total_samples, 2);
}
