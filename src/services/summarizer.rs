//! Bullet-point summaries through the language model.

use crate::services::llm::{LanguageModel, ModelError};

const SUMMARY_PROMPT: &str = "You are an expert academic assistant. Your task is to provide a \
high-quality, concise summary of the following document.
Generate the summary as a list of key bullet points, with each point starting with a '*'.

DOCUMENT:
\"{document}\"

BULLET POINT SUMMARY:
";

fn build_prompt(document: &str) -> String {
    SUMMARY_PROMPT.replace("{document}", document)
}

/// Splits text into consecutive chunks of at most `chunk_words` words.
fn word_chunks(text: &str, chunk_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_words.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Summarizes `text` as bullet points.
///
/// Long documents are summarized chunk by chunk. Chunks the model fails on
/// are skipped; the error is returned only if no chunk succeeded.
pub async fn summarize(
    llm: &dyn LanguageModel,
    model: &str,
    text: &str,
    chunk_words: usize,
) -> Result<String, ModelError> {
    let chunks = word_chunks(text, chunk_words);
    if chunks.is_empty() {
        return Err(ModelError::InvalidResponse("Cannot summarize empty text.".to_string()));
    }

    tracing::info!("Generating bullet-point summary over {} chunk(s)", chunks.len());

    let mut parts = Vec::with_capacity(chunks.len());
    let mut last_error = None;

    for (i, chunk) in chunks.iter().enumerate() {
        match llm.complete(model, &build_prompt(chunk)).await {
            Ok(summary) if !summary.trim().is_empty() => parts.push(summary.trim().to_string()),
            Ok(_) => {
                tracing::warn!("Empty summary for chunk {}", i);
            }
            Err(e) => {
                tracing::error!("Summary generation failed for chunk {}: {}", i, e);
                last_error = Some(e);
            }
        }
    }

    if parts.is_empty() {
        return Err(last_error.unwrap_or_else(|| {
            ModelError::InvalidResponse("Summarizer produced no output.".to_string())
        }));
    }

    Ok(parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a bullet per call; fails on calls listed in `fail_on`.
    struct ScriptedModel {
        calls: Mutex<usize>,
        fail_on: Vec<usize>,
    }

    impl ScriptedModel {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                calls: Mutex::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _model: &str, prompt: &str) -> Result<String, ModelError> {
            let mut calls = self.calls.lock().unwrap();
            let n = *calls;
            *calls += 1;
            if self.fail_on.contains(&n) {
                return Err(ModelError::Network("down".into()));
            }
            assert!(prompt.contains("BULLET POINT SUMMARY"));
            Ok(format!("* part {}\n", n))
        }
    }

    #[test]
    fn chunks_by_word_count() {
        let chunks = word_chunks("a b c d e", 2);
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
        assert!(word_chunks("   ", 2).is_empty());
    }

    #[tokio::test]
    async fn short_text_is_a_single_call() {
        let model = ScriptedModel::new(vec![]);
        let summary = summarize(&model, "m", "Cells divide by mitosis.", 100).await.unwrap();
        assert_eq!(summary, "* part 0");
    }

    #[tokio::test]
    async fn failed_chunks_are_skipped() {
        let model = ScriptedModel::new(vec![1]);
        let summary = summarize(&model, "m", "a b c d e f", 2).await.unwrap();
        assert_eq!(summary, "* part 0\n* part 2");
    }

    #[tokio::test]
    async fn all_chunks_failing_returns_error() {
        let model = ScriptedModel::new(vec![0, 1]);
        let err = summarize(&model, "m", "a b c d", 2).await.unwrap_err();
        assert!(matches!(err, ModelError::Network(_)));
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let model = ScriptedModel::new(vec![]);
        assert!(summarize(&model, "m", "  ", 10).await.is_err());
    }
}
