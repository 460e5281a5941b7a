//! Admin pipeline endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use books_pipeline::PipelineStatus;

use crate::auth::AdminUser;
use crate::context::AppState;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::schema::{TriggerParams, TriggerResponse};

pub fn scraping_routes() -> Router<AppState> {
    Router::new()
        .route("/scraping/trigger", post(trigger))
        .route("/scraping/status", get(status))
}

/// Start a scrape/import run in the background.
async fn trigger(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(params): ApiQuery<TriggerParams>,
) -> ApiResult<(StatusCode, Json<TriggerResponse>)> {
    let run_id = state.pipeline.trigger(&admin.username, params.mode).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            status: "accepted".to_string(),
            run_id,
            mode: params.mode,
            triggered_by: admin.username,
        }),
    ))
}

async fn status(State(state): State<AppState>, _admin: AdminUser) -> Json<PipelineStatus> {
    Json(state.pipeline.status().await)
}
