// src/handlers/activity.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{session_log::SessionLog, summary::Summary},
    utils::jwt::Claims,
};

/// Most recent entries returned by the activity feed.
const ACTIVITY_LIMIT: i64 = 100;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// The caller's stored summaries, newest first.
pub async fn list_summaries(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = sqlx::query_as::<_, Summary>(
        r#"
        SELECT id, user_id, document_hash, filename, summary, created_at
        FROM summaries
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await?;

    Ok(Json(summaries))
}

/// The caller's session log, newest first.
pub async fn list_activity(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, SessionLog>(
        r#"
        SELECT id, user_id, action, detail, created_at
        FROM session_logs
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(claims.user_id()?)
    .bind(ACTIVITY_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}
