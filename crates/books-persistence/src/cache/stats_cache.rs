//! # Statistics Cache
//!
//! In-process JSON cache for aggregate statistics. Entries expire after a
//! TTL and are discarded wholesale by [`StatsCache::invalidate`], which the
//! import pipeline calls after a successful run.
//!
//! Every invalidation bumps a generation counter. Writers capture the
//! generation before computing a value and store it only if no
//! invalidation happened in between, so a slow reader cannot re-insert
//! stats computed from pre-import data.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::Result;

/// Cache key for the catalog overview
pub const OVERVIEW_KEY: &str = "stats:overview";

/// Cache key for per-category statistics
pub const CATEGORY_STATS_KEY: &str = "stats:categories";

#[derive(Debug)]
struct Entry {
    json: String,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    generation: u64,
    last_invalidated: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct StatsCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    // =========================================================================
    // GENERIC OPERATIONS
    // =========================================================================

    /// Get a JSON value if present and not expired
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let state = self.state.read().await;
        match state.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                Ok(Some(serde_json::from_str(&entry.json)?))
            }
            _ => Ok(None),
        }
    }

    /// Store a JSON value computed under `generation`. Returns `false` (and
    /// stores nothing) if the cache was invalidated since.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, generation: u64) -> Result<bool> {
        let json = serde_json::to_string(value)?;
        let mut state = self.state.write().await;
        if state.generation != generation {
            return Ok(false);
        }
        state.entries.insert(
            key.to_string(),
            Entry {
                json,
                stored_at: Instant::now(),
            },
        );
        Ok(true)
    }

    /// Current generation; capture before computing a value to cache
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    // =========================================================================
    // INVALIDATION
    // =========================================================================

    /// Drop every entry and start a new generation
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.generation += 1;
        state.last_invalidated = Some(Utc::now());
        tracing::info!(generation = state.generation, "Stats cache invalidated");
    }

    /// When the cache was last invalidated, if ever
    pub async fn last_invalidated(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_invalidated
    }
}

/// Shared cache handle
pub type SharedStatsCache = Arc<StatsCache>;

pub fn shared_cache(ttl: Duration) -> SharedStatsCache {
    Arc::new(StatsCache::new(ttl))
}
