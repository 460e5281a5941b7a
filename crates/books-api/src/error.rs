//! # API Error Types
//!
//! Unified error handling for the HTTP layer. Every error maps to exactly one
//! status code and a stable machine-readable code:
//!
//! ```json
//! { "error": { "message": "...", "code": "RESOURCE_BUSY" } }
//! ```

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use books_analytics::AnalyticsError;
use books_domain::DomainError;
use books_persistence::PersistenceError;
use books_pipeline::PipelineError;
use thiserror::Error;

/// Shown instead of the real message for internal errors unless debug mode
/// is on.
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Full error text attached to error responses for the audit trail.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

/// Detail withheld from an internal error response body
#[derive(Debug, Clone)]
struct HiddenDetail(String);

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{entity_type} with id {id} not found")]
    NotFound { entity_type: String, id: String },

    #[error("No route for {0}")]
    UnknownRoute(String),

    #[error("{0}")]
    Validation(String),

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials: {0}")]
    InvalidToken(String),

    #[error("User account is inactive")]
    InactiveAccount,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Storage stayed locked through every retry
    #[error("Service temporarily unavailable: {0}")]
    ResourceBusy(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::UnknownRoute(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::InactiveAccount | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ResourceBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for clients
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::UnknownRoute(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::InactiveAccount => "ACCOUNT_INACTIVE",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "PIPELINE_RUNNING",
            Self::ResourceBusy(_) => "RESOURCE_BUSY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    fn render(&self, expose_internal: bool) -> Response {
        let message = match self {
            Self::Internal(_) if !expose_internal => INTERNAL_ERROR_MESSAGE.to_string(),
            _ => self.to_string(),
        };
        let body = serde_json::json!({
            "error": {
                "message": message,
                "code": self.error_code(),
            }
        });

        let mut response = (self.status_code(), axum::Json(body)).into_response();
        match self {
            Self::InvalidToken(_) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::Internal(detail) if !expose_internal => {
                response.extensions_mut().insert(HiddenDetail(detail.clone()));
            }
            _ => {}
        }
        response.extensions_mut().insert(ErrorMessage(self.to_string()));
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.render(false)
    }
}

/// Re-render an internal error response with its real message. Other
/// responses pass through unchanged.
pub fn reveal_internal_error(response: Response) -> Response {
    match response.extensions().get::<HiddenDetail>() {
        Some(HiddenDetail(detail)) => ApiError::Internal(detail.clone()).render(true),
        None => response,
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound { entity_type, key } => Self::NotFound {
                entity_type,
                id: key,
            },
            PersistenceError::InvalidQuery(msg) => Self::Validation(msg),
            PersistenceError::RetriesExhausted { .. } | PersistenceError::Busy(_) => {
                Self::ResourceBusy(err.to_string())
            }
            other => {
                tracing::error!(error = %other, "Persistence failure");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            other @ DomainError::InvalidBook { .. } => Self::Validation(other.to_string()),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::Persistence(e) => e.into(),
            AnalyticsError::InvalidParameter(msg) => Self::Validation(msg),
            other => {
                tracing::error!(error = %other, "Analytics failure");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::AlreadyRunning => Self::Conflict(err.to_string()),
            PipelineError::Persistence(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

// Extractor rejections are client errors.

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
