// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        quiz_result::{QuizResult, QuizStats, SubmitMcqsRequest, percentage},
        session_log::SessionLog,
    },
    utils::jwt::Claims,
};

/// Validates `score` and `total` as integers with `total > 0` and
/// `0 <= score <= total`.
fn parse_score(payload: &SubmitMcqsRequest) -> Result<(i64, i64), AppError> {
    let invalid = || AppError::BadRequest("Invalid score or total.".to_string());

    let score = payload.score.as_i64().ok_or_else(invalid)?;
    let total = payload.total.as_i64().ok_or_else(invalid)?;

    if total <= 0 || !(0..=total).contains(&score) {
        return Err(invalid());
    }
    Ok((score, total))
}

/// Students may only read their own results; teachers may read anyone's.
fn ensure_can_view(claims: &Claims, student: &str) -> Result<(), AppError> {
    if claims.is_teacher() || claims.username == student {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only view your own analytics.".to_string(),
        ))
    }
}

async fn fetch_results(pool: &SqlitePool, student: &str) -> Result<Vec<QuizResult>, AppError> {
    let results = sqlx::query_as::<_, QuizResult>(
        r#"
        SELECT id, user_id, student, score, total, percentage, mcqs, created_at
        FROM quiz_results
        WHERE student = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(student)
    .fetch_all(pool)
    .await?;

    Ok(results)
}

/// Stores a quiz attempt for the authenticated student.
///
/// The answered MCQs are kept exactly as submitted; they are only ever
/// returned as JSON.
pub async fn submit_mcqs(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitMcqsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let (score, total) = parse_score(&payload)?;

    let result = sqlx::query_as::<_, QuizResult>(
        r#"
        INSERT INTO quiz_results (user_id, student, score, total, percentage, mcqs, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, student, score, total, percentage, mcqs, created_at
        "#,
    )
    .bind(user_id)
    .bind(&claims.username)
    .bind(score)
    .bind(total)
    .bind(percentage(score, total))
    .bind(SqlJson(payload.mcqs))
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save quiz result: {:?}", e);
        AppError::from(e)
    })?;

    let detail = format!("{}/{}", score, total);
    SessionLog::record(&pool, user_id, "submit_mcqs", Some(&detail)).await;

    Ok(Json(json!({
        "message": "Result saved successfully!",
        "data": result,
    })))
}

/// Lists a student's quiz results, oldest first.
pub async fn get_analytics(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(student): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ensure_can_view(&claims, &student)?;
    let results = fetch_results(&pool, &student).await?;
    Ok(Json(results))
}

/// Aggregates a student's quiz results.
pub async fn get_stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(student): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    ensure_can_view(&claims, &student)?;
    let results = fetch_results(&pool, &student).await?;
    Ok(Json(QuizStats::from_results(&student, &results)))
}
