//! # Book Catalog REST API
//!
//! HTTP service over the book catalog.
//!
//! ## Features
//!
//! - **Catalog**: paginated listing, search, top-rated and price-range queries
//! - **Statistics**: cached catalog overview and per-category aggregates
//! - **ML**: feature matrix, training-data export (JSON/CSV), prediction intake
//! - **Auth**: JWT access/refresh tokens over bcrypt-hashed accounts
//! - **Admin pipeline**: background scrape/import with status reporting
//! - **Audit**: every request is recorded by a background logger
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │      (Trace, CORS, audit middleware, request timeout)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Route handlers                           │
//! │   (books, stats, ml, auth, scraping, health under /api/v1)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      AppState                               │
//! │ (repositories, analytics engine, pipeline, audit logger)    │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     Stats cache         │   │      SQLite (WAL)            │
//! │  (overview, categories) │   │   (source of truth)          │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod schema;
pub mod seed;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use context::AppState;
pub use error::{ApiError, ApiResult};

/// Prefix for every versioned endpoint
pub const API_PREFIX: &str = "/api/v1";

/// Build the Axum router
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::health_routes())
        .merge(routes::book_routes())
        .merge(routes::stats_routes())
        .merge(routes::ml_routes())
        .merge(routes::auth_routes())
        .merge(routes::scraping_routes());

    Router::new()
        .merge(routes::root_routes())
        .nest(API_PREFIX, api)
        .fallback(routes::unknown_route)
        // Innermost: a timed-out request drops its handler and session.
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::audit_requests,
        ))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
