//! Request audit trail queries

use books_domain::{ApiLog, NewApiLog};

use crate::error::Result;
use crate::session::ScopedSession;

pub async fn insert(session: &mut ScopedSession, record: &NewApiLog) -> Result<i64> {
    let id = sqlx::query_scalar(
        "INSERT INTO api_logs \
         (endpoint, method, status_code, response_time, timestamp, user_id, query_params, error_message) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&record.endpoint)
    .bind(&record.method)
    .bind(i64::from(record.status_code))
    .bind(record.response_time_ms)
    .bind(record.timestamp)
    .bind(record.user_id)
    .bind(&record.query_params)
    .bind(&record.error_message)
    .fetch_one(session.conn())
    .await?;
    Ok(id)
}

pub async fn count(session: &mut ScopedSession) -> Result<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM api_logs")
        .fetch_one(session.conn())
        .await?;
    Ok(total)
}

/// Most recent records first
pub async fn recent(session: &mut ScopedSession, limit: u32) -> Result<Vec<ApiLog>> {
    let logs = sqlx::query_as::<_, ApiLog>(
        "SELECT id, endpoint, method, status_code, response_time, timestamp, user_id, \
         query_params, error_message FROM api_logs ORDER BY id DESC LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(session.conn())
    .await?;
    Ok(logs)
}
