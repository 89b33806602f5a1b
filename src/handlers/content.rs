// src/handlers/content.rs

use std::sync::PoisonError;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::MCQ_REQUEST_LIMIT,
    error::AppError,
    handlers::form::DocumentForm,
    models::{
        session_log::SessionLog,
        summary::{GenerateMcqsRequest, GradeRequest, SummarizeResponse},
    },
    services::{
        document_cache::UNTITLED, evaluator::evaluate_answer, extract::extract_text, mcq,
        summarizer::summarize as summarize_text,
    },
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

const NO_TEXT_MESSAGE: &str = "No text provided or file could not be read!";

/// Summarizes pasted text, an uploaded file, or a previously cached document,
/// then generates MCQs from the summary.
///
/// Form fields: `text`, `file`, `document_hash` (first one present wins).
pub async fn summarize(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let scope = claims.document_scope()?;
    let form = DocumentForm::read(multipart, state.config.max_upload_bytes).await?;

    let (text, filename) = if let Some(text) = form.text("text") {
        (text.to_string(), UNTITLED.to_string())
    } else if let Some(file) = form.file {
        extract_text(file, state.config.max_upload_bytes)
            .await
            .map(|(filename, text)| (text, filename))?
    } else if let Some(hash) = form.text("document_hash") {
        let mut documents = state.documents.lock().unwrap_or_else(PoisonError::into_inner);
        let document = documents
            .get(hash, scope)
            .ok_or_else(|| AppError::BadRequest(NO_TEXT_MESSAGE.to_string()))?;
        (document.text.clone(), document.filename.clone())
    } else {
        return Err(AppError::BadRequest(NO_TEXT_MESSAGE.to_string()));
    };

    if text.trim().is_empty() {
        return Err(AppError::BadRequest(NO_TEXT_MESSAGE.to_string()));
    }

    let filename = clean_html(&filename);
    let document_hash = state
        .documents
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .store(&text, Some(&filename), user_id)?;

    let summary = summarize_text(
        state.llm.as_ref(),
        &state.config.processing_model,
        &text,
        state.config.summary_chunk_words,
    )
    .await?;

    let mcqs = mcq::generate_mcqs(&summary, state.config.max_mcqs);

    sqlx::query(
        r#"
        INSERT INTO summaries (user_id, document_hash, filename, summary, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&document_hash)
    .bind(&filename)
    .bind(&summary)
    .bind(chrono::Utc::now())
    .execute(&state.pool)
    .await?;

    SessionLog::record(&state.pool, user_id, "summarize", Some(&filename)).await;

    Ok(Json(SummarizeResponse {
        summary,
        mcqs,
        document_hash,
    }))
}

/// Generates extractive MCQs directly from the given text.
pub async fn generate_mcqs(
    State(state): State<AppState>,
    Json(payload): Json<GenerateMcqsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let count = payload
        .num_questions
        .unwrap_or(state.config.max_mcqs)
        .min(MCQ_REQUEST_LIMIT);
    let mcqs = mcq::generate_mcqs(&payload.text, count);

    Ok(Json(json!({ "mcqs": mcqs })))
}

/// Grades a free-text answer against a reference answer.
pub async fn grade(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let grade = evaluate_answer(
        state.embedder.as_ref(),
        &state.config.embedding_model,
        &payload.answer,
        &payload.reference,
    )
    .await?;

    let detail = format!("score {}", grade.score);
    SessionLog::record(&state.pool, user_id, "grade", Some(&detail)).await;

    Ok(Json(grade))
}
