//! Health check endpoints

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::VERSION;
use crate::context::AppState;
use crate::schema::{HealthResponse, RootResponse};

/// Routes mounted at the server root
pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(root))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Welcome to {}", state.config.app_name),
        version: VERSION.to_string(),
        health: "/api/v1/health".to_string(),
    })
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.db.health_check().await {
        Ok(()) => ("healthy", "connected".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            ("degraded", format!("error: {e}"))
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        app_name: state.config.app_name.clone(),
        version: VERSION.to_string(),
        environment: state.config.environment.clone(),
        database,
    })
}
