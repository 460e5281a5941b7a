//! Login, token refresh and current-user endpoints

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use books_domain::User;

use crate::auth::{self, CurrentUser, TokenPair, TokenType};
use crate::context::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiForm, ApiJson};
use crate::schema::{LoginForm, RefreshRequest};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> ApiResult<Json<TokenPair>> {
    let user = auth::authenticate(state.users.as_ref(), &form.username, &form.password).await?;
    tracing::info!(username = %user.username, "User logged in");
    Ok(Json(state.tokens.issue_pair(&user.username)?))
}

async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let claims = state.tokens.verify(&request.refresh_token, TokenType::Refresh)?;

    let user = state
        .users
        .find_by_username(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::InvalidToken("user is missing or inactive".into()))?;

    Ok(Json(state.tokens.issue_pair(&user.username)?))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
