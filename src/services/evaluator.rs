//! Grades a free-text answer by embedding similarity to a reference.

use serde::Serialize;

use crate::services::llm::{Embedder, ModelError, cosine_similarity};

pub const EMPTY_ANSWER_FEEDBACK: &str = "⚠️ Please write an answer first.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grade {
    /// 0.0 to 10.0, one decimal.
    pub score: f64,
    pub feedback: String,
}

/// Maps cosine similarity to a 0-10 score with one decimal.
pub fn similarity_to_score(similarity: f32) -> f64 {
    let clamped = f64::from(similarity.max(0.0).min(1.0));
    (clamped * 100.0).round() / 10.0
}

pub fn feedback_for(score: f64) -> String {
    if score > 8.5 {
        format!("🌟 Excellent! Your answer is highly relevant. (Score: {:.1})", score)
    } else if score > 6.5 {
        format!("👍 Good job! You are on the right track. (Score: {:.1})", score)
    } else if score > 4.0 {
        format!("🤔 Fair attempt. Some key points are missing. (Score: {:.1})", score)
    } else {
        format!("⚡ Needs improvement. Main points are missing. (Score: {:.1})", score)
    }
}

/// Embeds both texts and grades their similarity.
/// An empty answer scores 0 without touching the model.
pub async fn evaluate_answer(
    embedder: &dyn Embedder,
    model: &str,
    answer: &str,
    reference: &str,
) -> Result<Grade, ModelError> {
    if answer.trim().is_empty() {
        return Ok(Grade {
            score: 0.0,
            feedback: EMPTY_ANSWER_FEEDBACK.to_string(),
        });
    }

    let vectors = embedder
        .embed(model, &[answer.to_string(), reference.to_string()])
        .await?;
    let [student, expected] = vectors.as_slice() else {
        return Err(ModelError::InvalidResponse(format!(
            "expected 2 embeddings, got {}",
            vectors.len()
        )));
    };

    let score = similarity_to_score(cosine_similarity(student, expected));
    Ok(Grade {
        score,
        feedback: feedback_for(score),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<Vec<f32>>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _model: &str, _texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn score_is_rounded_to_one_decimal() {
        assert_eq!(similarity_to_score(0.876), 8.8);
        assert_eq!(similarity_to_score(1.0), 10.0);
        assert_eq!(similarity_to_score(-0.4), 0.0);
    }

    #[test]
    fn feedback_tiers() {
        assert!(feedback_for(9.0).starts_with("🌟 Excellent"));
        assert!(feedback_for(8.5).starts_with("👍 Good job"));
        assert!(feedback_for(5.0).starts_with("🤔 Fair attempt"));
        assert!(feedback_for(4.0).starts_with("⚡ Needs improvement"));
        assert!(feedback_for(7.2).ends_with("(Score: 7.2)"));
    }

    #[test]
    fn whole_scores_keep_one_decimal() {
        assert!(feedback_for(9.0).ends_with("(Score: 9.0)"));
        assert!(feedback_for(10.0).ends_with("(Score: 10.0)"));
        assert!(feedback_for(0.0).ends_with("(Score: 0.0)"));
    }

    #[tokio::test]
    async fn identical_vectors_score_ten() {
        let embedder = FixedEmbedder(vec![vec![1.0, 2.0], vec![1.0, 2.0]]);
        let grade = evaluate_answer(&embedder, "m", "answer", "reference").await.unwrap();
        assert_eq!(grade.score, 10.0);
        assert!(grade.feedback.contains("Excellent"));
        assert!(grade.feedback.ends_with("(Score: 10.0)"));
    }

    #[tokio::test]
    async fn orthogonal_vectors_score_zero() {
        let embedder = FixedEmbedder(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let grade = evaluate_answer(&embedder, "m", "answer", "reference").await.unwrap();
        assert_eq!(grade.score, 0.0);
    }

    #[tokio::test]
    async fn empty_answer_short_circuits() {
        let embedder = FixedEmbedder(vec![]);
        let grade = evaluate_answer(&embedder, "m", "  ", "reference").await.unwrap();
        assert_eq!(grade.score, 0.0);
        assert_eq!(grade.feedback, EMPTY_ANSWER_FEEDBACK);
    }

    #[tokio::test]
    async fn wrong_embedding_count_is_an_error() {
        let embedder = FixedEmbedder(vec![vec![1.0]]);
        assert!(evaluate_answer(&embedder, "m", "a", "b").await.is_err());
    }
}
