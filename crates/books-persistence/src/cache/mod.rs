//! # Cache Module
//!
//! In-process cache for computed statistics.

pub mod stats_cache;

pub use stats_cache::{
    CATEGORY_STATS_KEY, OVERVIEW_KEY, SharedStatsCache, StatsCache, shared_cache,
};
