//! # Authentication
//!
//! HS256 JWT access/refresh tokens and bcrypt password hashes. Hashing and
//! verification are CPU-bound and run on the blocking pool.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use books_domain::User;
use books_persistence::UserRepository;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;
use crate::context::AppState;
use crate::error::{ApiError, ApiResult};

/// bcrypt only looks at the first 72 bytes of a password
const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Signs and verifies tokens with the configured secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(
            &settings.secret_key,
            settings.access_token_ttl,
            settings.refresh_token_ttl,
        )
    }

    /// Sign a token of the given type for `username`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, username: &str, token_type: TokenType) -> ApiResult<String> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            token_type,
            iat: now,
            exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Fresh access and refresh tokens for `username`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Internal`] if signing fails.
    pub fn issue_pair(&self, username: &str) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(username, TokenType::Access)?,
            refresh_token: self.issue(username, TokenType::Refresh)?,
            token_type: "bearer".to_string(),
        })
    }

    /// Decode `token` and check its signature, expiry and type.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidToken`] for any token that is not a valid,
    /// unexpired token of `expected` type.
    pub fn verify(&self, token: &str, expected: TokenType) -> ApiResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| ApiError::InvalidToken(e.to_string()))?;

        if data.claims.token_type != expected {
            return Err(ApiError::InvalidToken(format!(
                "expected {expected:?} token, got {:?}",
                data.claims.token_type
            )));
        }
        Ok(data.claims)
    }
}

// =============================================================================
// PASSWORDS
// =============================================================================

fn truncated(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(BCRYPT_MAX_PASSWORD_BYTES)]
}

/// Hash a password with the given bcrypt cost.
///
/// # Errors
///
/// [`ApiError::Internal`] if hashing fails or the worker panics.
pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(truncated(&password), cost))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored bcrypt hash.
///
/// # Errors
///
/// [`ApiError::Internal`] if the hash is malformed or the worker panics.
pub async fn verify_password(password: String, hashed: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(truncated(&password), &hashed))
        .await
        .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))
}

/// Look up `username` and check `password`.
///
/// # Errors
///
/// [`ApiError::InvalidCredentials`] for an unknown user or wrong password,
/// [`ApiError::InactiveAccount`] for a disabled account.
pub async fn authenticate(
    users: &dyn UserRepository,
    username: &str,
    password: &str,
) -> ApiResult<User> {
    let Some(user) = users.find_by_username(username).await? else {
        tracing::info!(username, "Login failed: unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password.to_string(), user.hashed_password.clone()).await? {
        tracing::info!(username, "Login failed: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(ApiError::InactiveAccount);
    }
    Ok(user)
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Slot the audit middleware places in request extensions; filled with the
/// user id once a handler authenticates the caller.
#[derive(Debug, Clone, Default)]
pub struct AuthenticatedUserId(Arc<OnceLock<i64>>);

impl AuthenticatedUserId {
    pub fn get(&self) -> Option<i64> {
        self.0.get().copied()
    }

    fn set(&self, user_id: i64) {
        let _ = self.0.set(user_id);
    }
}

/// The active user named by a valid bearer access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token, TokenType::Access)?;

        let user = state
            .users
            .find_by_username(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::InvalidToken("user no longer exists".into()))?;
        if !user.is_active {
            return Err(ApiError::InactiveAccount);
        }

        if let Some(slot) = parts.extensions.get::<AuthenticatedUserId>() {
            slot.set(user.id);
        }
        Ok(Self(user))
    }
}

/// A [`CurrentUser`] with administrator privileges
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(username = %user.username, "Admin endpoint refused");
            return Err(ApiError::Forbidden("administrator privileges required".into()));
        }
        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> ApiResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::InvalidToken("missing bearer token".into()))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::InvalidToken("malformed authorization header".into()))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::InvalidToken("missing bearer token".into()))
}
