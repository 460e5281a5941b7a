//! User account queries

use books_domain::{NewUser, User};
use chrono::Utc;

use crate::error::Result;
use crate::session::ScopedSession;

const USER_COLUMNS: &str = "id, username, email, hashed_password, is_active, is_admin, created_at";

pub async fn find_by_username(session: &mut ScopedSession, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(session.conn())
    .await?;
    Ok(user)
}

pub async fn find_by_email(session: &mut ScopedSession, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(session.conn())
    .await?;
    Ok(user)
}

/// Insert a user and return the stored row
pub async fn insert(session: &mut ScopedSession, user: &NewUser) -> Result<User> {
    let stored = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, hashed_password, is_active, is_admin, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.hashed_password)
    .bind(user.is_active)
    .bind(user.is_admin)
    .bind(Utc::now())
    .fetch_one(session.conn())
    .await?;
    Ok(stored)
}

pub async fn count(session: &mut ScopedSession) -> Result<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(session.conn())
        .await?;
    Ok(total)
}
