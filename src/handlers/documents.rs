// src/handlers/documents.rs

use std::sync::PoisonError;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, state::AppState, utils::jwt::Claims};

/// The caller's cached documents, most recently used first.
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scope = claims.document_scope()?;
    let documents = state
        .documents
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .list(scope);
    Ok(Json(documents))
}

pub async fn document_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let scope = claims.document_scope()?;
    let stats = state
        .documents
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .stats(scope);
    Ok(Json(stats))
}

/// Someone else's document is reported as missing.
pub async fn get_document(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let scope = claims.document_scope()?;
    let document = state
        .documents
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&hash, scope)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    Ok(Json(document))
}
