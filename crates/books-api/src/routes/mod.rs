mod auth;
mod books;
mod health;
mod ml;
mod scraping;
mod stats;

use axum::extract::OriginalUri;

use crate::error::ApiError;

pub use auth::auth_routes;
pub use books::book_routes;
pub use health::{health_routes, root_routes};
pub use ml::ml_routes;
pub use scraping::scraping_routes;
pub use stats::stats_routes;

/// JSON 404 for unmatched paths
pub async fn unknown_route(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::UnknownRoute(uri.path().to_string())
}
