// src/models/summary.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::mcq::Mcq;

/// Represents the 'summaries' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,

    #[serde(skip)]
    pub user_id: i64,

    /// Content hash of the summarized document (see the document cache).
    pub document_hash: String,

    pub filename: String,

    pub summary: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Response of the summarize endpoint.
#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub mcqs: Vec<Mcq>,
    pub document_hash: String,
}

/// DTO for generating MCQs straight from text.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateMcqsRequest {
    #[validate(length(min = 1, message = "Text must not be empty."))]
    pub text: String,
    #[validate(range(min = 1, max = 20, message = "num_questions must be between 1 and 20."))]
    pub num_questions: Option<usize>,
}

/// DTO for grading a free-text answer.
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub reference: String,
}
