// src/models/session_log.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Represents the 'session_logs' table: one row per user action.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: i64,

    #[serde(skip)]
    pub user_id: i64,

    /// e.g. 'login', 'summarize', 'ask', 'grade', 'submit_mcqs', 'logout'.
    pub action: String,

    pub detail: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SessionLog {
    /// Appends an entry. Failures are logged and swallowed: the activity
    /// log must never fail the request it describes.
    pub async fn record(pool: &SqlitePool, user_id: i64, action: &str, detail: Option<&str>) {
        let result = sqlx::query(
            r#"
            INSERT INTO session_logs (user_id, action, detail, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(detail)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to record session log '{}': {:?}", action, e);
        }
    }
}
