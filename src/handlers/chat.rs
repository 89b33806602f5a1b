// src/handlers/chat.rs

use std::sync::PoisonError;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    error::AppError,
    handlers::form::DocumentForm,
    models::session_log::SessionLog,
    services::{
        extract::extract_text,
        rag::{ChatError, NOT_READY_MESSAGE},
    },
    state::AppState,
    utils::jwt::Claims,
};

const UNREADABLE_DOCUMENT: &str = "Sorry, I could not read the document.";
const MISSING_QUESTION: &str = "Please ask a question.";
const UNKNOWN_DOCUMENT: &str = "That document is no longer available. Please upload it again.";

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_hash: Option<String>,
}

impl ChatResponse {
    fn new(answer: impl Into<String>, document_hash: Option<String>) -> Json<Self> {
        Json(Self {
            answer: answer.into(),
            document_hash,
        })
    }
}

/// Chats about a document.
///
/// Form fields: `question`, optional `file` (indexed and made the caller's
/// active document), optional `document_hash` (switches to one of the
/// caller's cached documents). Model failures come back as the answer text so the chat
/// window can show them.
pub async fn ask_ai(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let scope = claims.document_scope()?;
    let form = DocumentForm::read(multipart, state.config.max_upload_bytes).await?;
    let question = form.text("question").map(str::to_string);

    let mut selected = None;

    if let Some(file) = form.file {
        let (filename, text) = match extract_text(file, state.config.max_upload_bytes).await {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!("Chat upload could not be read: {}", e);
                return Ok(ChatResponse::new(UNREADABLE_DOCUMENT, None));
            }
        };

        let hash = state
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store(&text, Some(&filename), user_id)?;

        if let Err(e) = state.chatbot.setup_document(&hash, &text).await {
            tracing::warn!("Failed to index document {}: {}", hash, e);
            return Ok(ChatResponse::new(e.user_message(), Some(hash)));
        }
        state.chatbot.activate(user_id, &hash);
        SessionLog::record(&state.pool, user_id, "index_document", Some(&filename)).await;

        if question.is_none() {
            let message = format!(
                "'{}' has been processed. You can now ask questions about it.",
                filename
            );
            return Ok(ChatResponse::new(message, Some(hash)));
        }
        selected = Some(hash);
    } else if let Some(hash) = form.text("document_hash") {
        let text = state
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_text(hash, scope);
        let Some(text) = text else {
            return Ok(ChatResponse::new(UNKNOWN_DOCUMENT, None));
        };
        if !state.chatbot.activate(user_id, hash) {
            if let Err(e) = state.chatbot.setup_document(hash, &text).await {
                tracing::warn!("Failed to index document {}: {}", hash, e);
                return Ok(ChatResponse::new(e.user_message(), Some(hash.to_string())));
            }
            state.chatbot.activate(user_id, hash);
        }
        selected = Some(hash.to_string());
    }

    let Some(question) = question else {
        return Ok(ChatResponse::new(MISSING_QUESTION, selected));
    };

    let answer = match state.chatbot.answer_query(user_id, &question).await {
        Ok(answer) => answer,
        Err(ChatError::NotReady) => NOT_READY_MESSAGE.to_string(),
        Err(ChatError::Model(e)) => {
            tracing::warn!("Chat model failed: {}", e);
            e.user_message()
        }
    };

    SessionLog::record(&state.pool, user_id, "ask", Some(&question)).await;

    let document_hash = selected.or_else(|| state.chatbot.active_document(user_id));
    Ok(ChatResponse::new(answer, document_hash))
}
