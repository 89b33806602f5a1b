//! Model backends: chat completion and text embedding.
//!
//! Handlers only see the [`LanguageModel`] and [`Embedder`] traits; the
//! production implementation talks to a local Ollama server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::instrument;

/// Errors raised by model backends.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Backend unreachable or the connection dropped.
    #[error("network error: {0}")]
    Network(String),
    /// Request exceeded the configured timeout (seconds).
    #[error("request timed out after {0}s")]
    Timeout(u64),
    /// The requested model is not installed on the backend.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// Backend answered with an error status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    /// Backend answered 2xx but the body was not usable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Message safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            ModelError::Network(_) => {
                "The AI backend is not reachable. Is the Ollama app running?".to_string()
            }
            ModelError::Timeout(secs) => {
                format!("The AI backend did not answer within {} seconds.", secs)
            }
            ModelError::ModelNotFound(model) => {
                format!("Model '{}' is not available. Pull it with: ollama pull {}", model, model)
            }
            ModelError::Api { .. } | ModelError::InvalidResponse(_) => {
                "The AI backend returned an error. Please try again later.".to_string()
            }
        }
    }
}

/// Text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError>;
}

/// Sentence embedding backend. Returns one vector per input, in order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError>;
}

/// Cosine similarity of two vectors; 0 when lengths differ or a norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Ollama HTTP client (`/api/chat` and `/api/embed`).
pub struct OllamaClient {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        })
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        model: &str,
        body: &B,
    ) -> Result<R, ModelError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ModelError::Network(format!(
                        "Ollama not reachable at {}. Start it with: ollama serve",
                        self.base_url
                    ))
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ModelError::ModelNotFound(model.to_string()));
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, message });
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("failed to parse response: {e}")))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl LanguageModel for OllamaClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response: ChatResponse = self.post_json("/api/chat", model, &body).await?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    #[instrument(skip(self, texts), fields(inputs = texts.len()))]
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbedRequest { model, input: texts };
        let response: EmbedResponse = self.post_json("/api/embed", model, &body).await?;

        if response.embeddings.len() != texts.len() {
            return Err(ModelError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}
