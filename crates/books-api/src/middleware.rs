//! Request audit middleware.
//!
//! Times every request, stamps `X-Response-Time` on the response and hands
//! an audit record to the background logger. The hand-off never waits and
//! never fails, so the response is identical whether or not the record is
//! eventually written.
//!
//! In debug mode internal error responses carry their real message.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use books_domain::NewApiLog;

use crate::auth::AuthenticatedUserId;
use crate::context::AppState;
use crate::error::{self, ErrorMessage};

pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

pub async fn audit_requests(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let endpoint = request.uri().path().to_string();
    let method = request.method().to_string();
    let query_params = request.uri().query().map(str::to_string);

    let user_slot = AuthenticatedUserId::default();
    request.extensions_mut().insert(user_slot.clone());

    let mut response = next.run(request).await;
    if state.config.debug {
        response = error::reveal_internal_error(response);
    }

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.2}ms")) {
        response.headers_mut().insert(X_RESPONSE_TIME, value);
    }

    let status = response.status();
    let error_message = if status.is_client_error() || status.is_server_error() {
        response
            .extensions()
            .get::<ErrorMessage>()
            .map(|m| m.0.clone())
            .or_else(|| status.canonical_reason().map(str::to_string))
    } else {
        None
    };

    tracing::debug!(
        %method,
        endpoint = %endpoint,
        status = status.as_u16(),
        elapsed_ms,
        "Request completed"
    );

    state.audit.log_async(
        NewApiLog::new(endpoint, method, status.as_u16(), elapsed_ms)
            .with_query_params(query_params)
            .with_user_id(user_slot.get())
            .with_error_message(error_message),
    );

    response
}
