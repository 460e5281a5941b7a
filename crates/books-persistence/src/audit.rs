//! # Background Audit Logger
//!
//! Request audit records are handed to a dedicated worker task over a
//! bounded channel. The request path never waits on the write: a full queue
//! drops the record with a warning, and storage failures are logged by the
//! worker and swallowed.
//!
//! The worker takes everything queued (up to [`MAX_BATCH`]) in one go and
//! writes it in a single session. The settle delay counts from when a
//! record was queued, so a backlog is written without further pauses.
//!
//! The worker drains the queue until every [`AuditLogger`] handle has been
//! dropped, then exits; awaiting its `JoinHandle` at shutdown flushes
//! pending records.

use std::time::{Duration, Instant};

use books_domain::NewApiLog;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::Database;
use crate::error::Result;
use crate::queries;
use crate::retry::RetryPolicy;
use crate::session::ScopedSession;

#[derive(Debug, Clone, Copy)]
pub struct AuditConfig {
    /// Records buffered before new ones are dropped
    pub queue_capacity: usize,

    /// Minimum age of a record before it is written, so the request's own
    /// transaction can finish
    pub settle_delay: Duration,

    pub retry: RetryPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            settle_delay: Duration::from_millis(50),
            retry: RetryPolicy::new(2, Duration::from_millis(50), 2),
        }
    }
}

impl AuditConfig {
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Most records written in one session
pub const MAX_BATCH: usize = 256;

#[derive(Debug)]
struct Queued {
    record: NewApiLog,
    enqueued_at: Instant,
}

/// Handle for enqueueing audit records. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    tx: mpsc::Sender<Queued>,
}

impl AuditLogger {
    /// Start the worker task on the current runtime.
    pub fn spawn(db: Database, config: AuditConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(run_worker(db, config, rx));
        (Self { tx }, handle)
    }

    /// Enqueue a record without waiting. Never fails from the caller's
    /// point of view.
    pub fn log_async(&self, record: NewApiLog) {
        let queued = Queued {
            record,
            enqueued_at: Instant::now(),
        };
        match self.tx.try_send(queued) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(Queued { record, .. })) => {
                tracing::warn!(
                    endpoint = %record.endpoint,
                    method = %record.method,
                    status_code = record.status_code,
                    "Audit queue full, dropping record"
                );
            }
            Err(mpsc::error::TrySendError::Closed(Queued { record, .. })) => {
                tracing::warn!(
                    endpoint = %record.endpoint,
                    "Audit worker stopped, dropping record"
                );
            }
        }
    }
}

async fn run_worker(db: Database, config: AuditConfig, mut rx: mpsc::Receiver<Queued>) {
    tracing::debug!(capacity = config.queue_capacity, "Audit worker started");

    let mut batch = Vec::with_capacity(MAX_BATCH);
    while rx.recv_many(&mut batch, MAX_BATCH).await > 0 {
        // The newest record is the last to reach the settle delay.
        if let Some(newest) = batch.last() {
            let remaining = config.settle_delay.saturating_sub(newest.enqueued_at.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }

        write_batch(&db, config.retry, &batch).await;
        batch.clear();
    }

    tracing::debug!("Audit worker stopped");
}

async fn write_batch(db: &Database, retry: RetryPolicy, batch: &[Queued]) {
    let result = retry
        .run("write_api_logs", move || async move {
            let mut session = db.acquire_session().await?;
            let written = insert_all(&mut session, batch).await;
            session.finish(written).await
        })
        .await;

    if let Err(err) = result {
        tracing::error!(
            records = batch.len(),
            first_endpoint = batch.first().map(|q| q.record.endpoint.as_str()),
            error = %err,
            "Failed to write audit records"
        );
    }
}

async fn insert_all(session: &mut ScopedSession, batch: &[Queued]) -> Result<usize> {
    for queued in batch {
        queries::api_logs::insert(session, &queued.record).await?;
    }
    Ok(batch.len())
}
