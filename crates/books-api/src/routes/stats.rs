//! Aggregate statistics, served from the stats cache

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use books_analytics::{CategoryStatsReport, OverviewStats};

use crate::context::AppState;
use crate::error::ApiResult;

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/overview", get(overview))
        .route("/stats/categories", get(category_stats))
}

async fn overview(State(state): State<AppState>) -> ApiResult<Json<OverviewStats>> {
    Ok(Json(state.analytics.overview().await?))
}

async fn category_stats(State(state): State<AppState>) -> ApiResult<Json<CategoryStatsReport>> {
    Ok(Json(state.analytics.category_stats().await?))
}
