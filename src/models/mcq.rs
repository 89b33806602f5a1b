// src/models/mcq.rs

use serde::{Deserialize, Serialize};

/// A generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,

    /// Answer plus distractors, shuffled.
    pub options: Vec<String>,

    pub answer: String,
}
