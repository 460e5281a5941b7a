//! # Admin Pipeline Orchestrator
//!
//! Runs scrape, then import, then cache invalidation, one run at a time:
//!
//! ```text
//! Idle -> Running(scrape) -> Running(import) -> Running(cache_invalidation) -> Idle
//! ```
//!
//! Any failure returns to `Idle` with a failed outcome and skips the later
//! steps, so a failed run never invalidates the stats cache and never
//! touches the catalog beyond what its own (rolled back) import did.
//! External steps run under a hard timeout; on expiry the step's future is
//! dropped, which kills a child process and rolls back an import session.
//! A panicking step is recorded as a failure of the stage it panicked in.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use books_persistence::{Database, RetryPolicy, SharedStatsCache};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::csv_import;
use crate::error::{PipelineError, Result};
use crate::import::{ImportMode, ImportReport, import_books};

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Scrape,
    Import,
    CacheInvalidation,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Import => "import",
            Self::CacheInvalidation => "cache_invalidation",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Running(PipelineStage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded { report: ImportReport },
    Failed { stage: PipelineStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub triggered_by: String,
    pub mode: ImportMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `None` while the run is in progress
    pub outcome: Option<RunOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    #[serde(flatten)]
    pub state: PipelineState,
    pub last_run: Option<RunRecord>,
}

// =============================================================================
// STEPS
// =============================================================================

/// Refreshes the source data (the CSV file) from upstream
#[async_trait]
pub trait ScrapeJob: Send + Sync {
    async fn scrape(&self) -> Result<()>;
}

/// Loads the source data into the catalog
#[async_trait]
pub trait ImportJob: Send + Sync {
    async fn import(&self, mode: ImportMode) -> Result<ImportReport>;
}

/// Scraper run as an external process. A non-zero exit is a failure.
#[derive(Debug, Clone)]
pub struct CommandScrapeJob {
    command: Option<Vec<String>>,
}

impl CommandScrapeJob {
    /// `command` is split on whitespace into program and arguments.
    /// `None` or a blank command makes every run fail as not configured.
    pub fn new(command: Option<&str>) -> Self {
        let command = command
            .map(|c| c.split_whitespace().map(String::from).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());
        Self { command }
    }
}

#[async_trait]
impl ScrapeJob for CommandScrapeJob {
    async fn scrape(&self) -> Result<()> {
        let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
            return Err(PipelineError::StepFailed {
                stage: PipelineStage::Scrape,
                reason: "scraper command not configured".into(),
            });
        };

        tracing::info!(program = %program, "Running scraper");
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::StepFailed {
                stage: PipelineStage::Scrape,
                reason: format!("failed to start {program}: {e}"),
            })?;

        if output.status.success() {
            tracing::info!(stdout_bytes = output.stdout.len(), "Scraper finished");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(PipelineError::StepFailed {
                stage: PipelineStage::Scrape,
                reason: format!("{} {}", output.status, stderr.trim()).trim().to_string(),
            })
        }
    }
}

/// Import of the scraped CSV file into the catalog database
#[derive(Debug, Clone)]
pub struct CsvImportJob {
    db: Database,
    retry: RetryPolicy,
    csv_path: PathBuf,
}

impl CsvImportJob {
    pub fn new(db: Database, retry: RetryPolicy, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            retry,
            csv_path: csv_path.into(),
        }
    }
}

#[async_trait]
impl ImportJob for CsvImportJob {
    async fn import(&self, mode: ImportMode) -> Result<ImportReport> {
        let path = self.csv_path.clone();
        let books = tokio::task::spawn_blocking(move || csv_import::read_books(path))
            .await
            .map_err(|e| PipelineError::StepFailed {
                stage: PipelineStage::Import,
                reason: format!("CSV reader task failed: {e}"),
            })??;

        tracing::info!(path = %self.csv_path.display(), rows = books.len(), "CSV loaded");
        import_books(&self.db, self.retry, &books, mode).await
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub scrape_timeout: Duration,
    pub import_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(300),
            import_timeout: Duration::from_secs(120),
        }
    }
}

/// Single-flight scrape/import pipeline. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    scraper: Arc<dyn ScrapeJob>,
    importer: Arc<dyn ImportJob>,
    cache: SharedStatsCache,
    config: PipelineConfig,
    status: Arc<Mutex<PipelineStatus>>,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    pub fn new(
        scraper: Arc<dyn ScrapeJob>,
        importer: Arc<dyn ImportJob>,
        cache: SharedStatsCache,
        config: PipelineConfig,
    ) -> Self {
        Self {
            scraper,
            importer,
            cache,
            config,
            status: Arc::new(Mutex::new(PipelineStatus::default())),
        }
    }

    /// Current state and the most recent run
    pub async fn status(&self) -> PipelineStatus {
        self.status.lock().await.clone()
    }

    /// Start a run in the background and return its id immediately.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyRunning`] if a run is in progress.
    pub async fn trigger(&self, triggered_by: &str, mode: ImportMode) -> Result<Uuid> {
        let run_id = self.begin(triggered_by, mode).await?;
        let this = self.clone();
        tokio::spawn(async move {
            this.execute(run_id, mode).await;
        });
        Ok(run_id)
    }

    /// Run to completion and return the finished record.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyRunning`] if a run is in progress. Step
    /// failures are reported in the record's outcome, not as errors.
    pub async fn run(&self, triggered_by: &str, mode: ImportMode) -> Result<RunRecord> {
        let run_id = self.begin(triggered_by, mode).await?;
        Ok(self.execute(run_id, mode).await)
    }

    async fn begin(&self, triggered_by: &str, mode: ImportMode) -> Result<Uuid> {
        let mut status = self.status.lock().await;
        if let PipelineState::Running(stage) = status.state {
            tracing::warn!(%stage, triggered_by, "Pipeline trigger rejected, run in progress");
            return Err(PipelineError::AlreadyRunning);
        }

        let run_id = Uuid::now_v7();
        status.state = PipelineState::Running(PipelineStage::Scrape);
        status.last_run = Some(RunRecord {
            run_id,
            triggered_by: triggered_by.to_string(),
            mode,
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
        });
        tracing::info!(%run_id, triggered_by, %mode, "Pipeline run started");
        Ok(run_id)
    }

    async fn execute(&self, run_id: Uuid, mode: ImportMode) -> RunRecord {
        let outcome = match AssertUnwindSafe(self.steps(mode)).catch_unwind().await {
            Ok(Ok(report)) => RunOutcome::Succeeded { report },
            Ok(Err((stage, err))) => {
                tracing::error!(%run_id, %stage, error = %err, "Pipeline run failed");
                RunOutcome::Failed {
                    stage,
                    error: err.to_string(),
                }
            }
            Err(panic) => {
                let stage = self.current_stage().await;
                let error = format!("step panicked: {}", panic_message(panic.as_ref()));
                tracing::error!(%run_id, %stage, %error, "Pipeline run failed");
                RunOutcome::Failed { stage, error }
            }
        };

        let mut status = self.status.lock().await;
        status.state = PipelineState::Idle;
        let record = status.last_run.get_or_insert_with(|| RunRecord {
            run_id,
            triggered_by: String::new(),
            mode,
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
        });
        record.finished_at = Some(Utc::now());
        record.outcome = Some(outcome);
        if matches!(record.outcome, Some(RunOutcome::Succeeded { .. })) {
            tracing::info!(%run_id, "Pipeline run succeeded");
        }
        record.clone()
    }

    async fn steps(
        &self,
        mode: ImportMode,
    ) -> std::result::Result<ImportReport, (PipelineStage, PipelineError)> {
        self.enter(PipelineStage::Scrape).await;
        with_timeout(
            PipelineStage::Scrape,
            self.config.scrape_timeout,
            self.scraper.scrape(),
        )
        .await
        .map_err(|e| (PipelineStage::Scrape, e))?;

        self.enter(PipelineStage::Import).await;
        let report = with_timeout(
            PipelineStage::Import,
            self.config.import_timeout,
            self.importer.import(mode),
        )
        .await
        .map_err(|e| (PipelineStage::Import, e))?;

        self.enter(PipelineStage::CacheInvalidation).await;
        self.cache.invalidate().await;
        Ok(report)
    }

    async fn enter(&self, stage: PipelineStage) {
        self.status.lock().await.state = PipelineState::Running(stage);
        tracing::debug!(%stage, "Pipeline stage started");
    }

    async fn current_stage(&self) -> PipelineStage {
        match self.status.lock().await.state {
            PipelineState::Running(stage) => stage,
            PipelineState::Idle => PipelineStage::Scrape,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

async fn with_timeout<T>(
    stage: PipelineStage,
    timeout: Duration,
    step: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, step)
        .await
        .map_err(|_| PipelineError::StepTimedOut { stage, timeout })?
}
