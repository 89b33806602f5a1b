// src/models/quiz_result.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Represents the 'quiz_results' table in the database.
/// One row per submitted MCQ attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,

    #[serde(skip)]
    pub user_id: i64,

    /// Username of the student who took the quiz.
    pub student: String,

    pub score: i64,
    pub total: i64,

    /// score / total * 100, rounded to two decimals.
    pub percentage: f64,

    /// The questions as the client submitted them.
    pub mcqs: Json<Vec<serde_json::Value>>,

    #[serde(rename = "timestamp")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a quiz attempt.
///
/// `score` and `total` stay untyped so that floats, strings and missing
/// values all produce the same validation error instead of a parse error.
#[derive(Debug, Deserialize)]
pub struct SubmitMcqsRequest {
    #[serde(default)]
    pub score: serde_json::Value,
    #[serde(default)]
    pub total: serde_json::Value,
    #[serde(default)]
    pub mcqs: Vec<serde_json::Value>,
}

/// Aggregated results for one student.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuizStats {
    pub student: String,
    pub attempts: usize,
    pub average_percentage: Option<f64>,
    pub best_percentage: Option<f64>,
    pub latest_percentage: Option<f64>,
    pub latest_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl QuizStats {
    /// `results` must be ordered oldest first.
    pub fn from_results(student: &str, results: &[QuizResult]) -> Self {
        let attempts = results.len();
        let sum: f64 = results.iter().map(|r| r.percentage).sum();
        let latest = results.last();

        Self {
            student: student.to_string(),
            attempts,
            average_percentage: (attempts > 0)
                .then(|| (sum / attempts as f64 * 100.0).round() / 100.0),
            best_percentage: results.iter().map(|r| r.percentage).reduce(f64::max),
            latest_percentage: latest.map(|r| r.percentage),
            latest_timestamp: latest.map(|r| r.created_at),
        }
    }
}

/// Percentage rounded to two decimals. `total` must be positive.
pub fn percentage(score: i64, total: i64) -> f64 {
    ((score as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
}
