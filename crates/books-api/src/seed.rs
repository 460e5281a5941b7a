//! Startup data seeding: initial catalog import and the admin account.

use std::path::Path;

use books_domain::{NewUser, User};
use books_persistence::{Database, RetryPolicy, UserRepository};
use books_pipeline::{ImportMode, ImportReport, PipelineError, import_books, read_books};

use crate::auth::hash_password;
use crate::config::AdminSettings;
use crate::error::ApiResult;

/// Load the CSV at `csv_path` into an empty catalog. A populated catalog is
/// left alone, and a missing file only produces a warning.
///
/// # Errors
///
/// Unreadable or invalid CSV content, or a storage failure.
pub async fn initial_import(
    db: &Database,
    retry: RetryPolicy,
    csv_path: &Path,
) -> Result<Option<ImportReport>, PipelineError> {
    if !tokio::fs::try_exists(csv_path).await.unwrap_or(false) {
        tracing::warn!(path = %csv_path.display(), "Initial catalog file not found, skipping import");
        return Ok(None);
    }

    let path = csv_path.to_path_buf();
    let books = tokio::task::spawn_blocking(move || read_books(path))
        .await
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))??;

    let report = import_books(db, retry, &books, ImportMode::SkipIfPopulated).await?;
    Ok(Some(report))
}

/// Outcome of [`ensure_admin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminSeed {
    Created(User),
    /// An account with the username or email already exists
    AlreadyExists,
}

/// Create the administrator account unless one with the same username or
/// email exists.
///
/// # Errors
///
/// Storage or hashing failures.
pub async fn ensure_admin(
    users: &dyn UserRepository,
    admin: &AdminSettings,
    password: &str,
    hash_cost: u32,
) -> ApiResult<AdminSeed> {
    if users.find_by_username(&admin.username).await?.is_some()
        || users.find_by_email(&admin.email).await?.is_some()
    {
        tracing::info!(username = %admin.username, "Admin account already exists");
        return Ok(AdminSeed::AlreadyExists);
    }

    let hashed_password = hash_password(password.to_string(), hash_cost).await?;
    let user = users
        .create(&NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            hashed_password,
            is_active: true,
            is_admin: true,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "Admin account created");
    Ok(AdminSeed::Created(user))
}
