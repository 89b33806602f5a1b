//! Retrieval-augmented chat over an uploaded document.
//!
//! A document is split into overlapping character chunks, each chunk is
//! embedded, and questions are answered by the language model using the
//! `top_k` most similar chunks as context.

use std::{
    collections::{HashMap, VecDeque},
    num::NonZeroUsize,
    sync::{Arc, Mutex, PoisonError},
};

use lru::LruCache;

use crate::services::llm::{Embedder, LanguageModel, ModelError, cosine_similarity};

pub const NOT_READY_MESSAGE: &str =
    "The document has not been processed yet or an error occurred during setup.";
pub const NO_ANSWER_MESSAGE: &str = "I could not find an answer.";

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];
const EMBED_BATCH: usize = 32;

const QA_PROMPT: &str = "Use the following pieces of context to answer the user's question.
If you don't know the answer from the context, just say that you don't know. Do not try to make up an answer.

Context: {context}
Question: {question}

Helpful Answer:
";

/// Recursive character splitter: tries paragraph, line, word, then
/// character boundaries, merging pieces up to `chunk_size` characters with
/// up to `overlap` characters carried into the next chunk.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if piece.chars().count() <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = separator.chars().count();
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            let joiner = if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current, separator);

                // Drop leading pieces until what is left fits the overlap budget.
                while total > self.overlap
                    || (total > 0 && total + len + sep_len > self.chunk_size)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    let trailing = if current.is_empty() { 0 } else { sep_len };
                    total -= first.chars().count() + trailing;
                }
            }

            let joiner = if current.is_empty() { 0 } else { sep_len };
            total += len + joiner;
            current.push_back(piece);
        }

        push_joined(&mut chunks, &current, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, pieces: &VecDeque<&str>, separator: &str) {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Embedded chunks of one document.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Self {
        Self { chunks, embeddings }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&str, f32)> {
        let mut scored: Vec<(&str, f32)> = self
            .chunks
            .iter()
            .zip(&self.embeddings)
            .map(|(chunk, embedding)| (chunk.as_str(), cosine_similarity(query, embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

#[derive(Debug)]
pub enum ChatError {
    /// The user has no indexed document selected.
    NotReady,
    Model(ModelError),
}

impl From<ModelError> for ChatError {
    fn from(err: ModelError) -> Self {
        ChatError::Model(err)
    }
}

pub struct RagChatbot {
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    chat_model: String,
    embedding_model: String,
    splitter: TextSplitter,
    top_k: usize,
    indexes: Mutex<LruCache<String, Arc<VectorIndex>>>,
    /// Document each user is currently chatting about.
    active: Mutex<HashMap<i64, String>>,
}

impl RagChatbot {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        chat_model: &str,
        embedding_model: &str,
        splitter: TextSplitter,
        top_k: usize,
        capacity: usize,
    ) -> Self {
        tracing::info!("Initializing RAG chatbot with model '{}'", chat_model);
        Self {
            llm,
            embedder,
            chat_model: chat_model.to_string(),
            embedding_model: embedding_model.to_string(),
            splitter,
            top_k: top_k.max(1),
            indexes: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_indexed(&self, hash: &str) -> bool {
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(hash)
    }

    /// Chunks and embeds a document. Returns the number of chunks indexed;
    /// already indexed documents are not embedded again.
    pub async fn setup_document(&self, hash: &str, text: &str) -> Result<usize, ModelError> {
        let existing = self
            .indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hash)
            .map(|index| index.len());
        if let Some(count) = existing {
            tracing::debug!("Document {} already indexed", hash);
            return Ok(count);
        }

        tracing::info!("Setting up RAG for a document of {} characters", text.len());
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            tracing::warn!("Text splitting resulted in no chunks");
            return Ok(0);
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            embeddings.extend(self.embedder.embed(&self.embedding_model, batch).await?);
        }

        let count = chunks.len();
        self.indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(hash.to_string(), Arc::new(VectorIndex::new(chunks, embeddings)));

        tracing::info!("Indexed {} chunks for document {}", count, hash);
        Ok(count)
    }

    /// Makes `hash` the user's chat document. False if it is not indexed.
    pub fn activate(&self, user_id: i64, hash: &str) -> bool {
        if !self.is_indexed(hash) {
            return false;
        }
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, hash.to_string());
        true
    }

    pub fn active_document(&self, user_id: i64) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    /// Answers `question` from the user's active document.
    pub async fn answer_query(&self, user_id: i64, question: &str) -> Result<String, ChatError> {
        let hash = self.active_document(user_id).ok_or(ChatError::NotReady)?;
        let index = self
            .indexes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&hash)
            .cloned()
            .ok_or(ChatError::NotReady)?;

        tracing::info!("Answering query against document {}", hash);

        let query_embedding = self
            .embedder
            .embed(&self.embedding_model, &[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no query embedding".to_string()))?;

        let context = index
            .search(&query_embedding, self.top_k)
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = QA_PROMPT
            .replace("{context}", &context)
            .replace("{question}", question);

        let answer = self.llm.complete(&self.chat_model, &prompt).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            Ok(NO_ANSWER_MESSAGE.to_string())
        } else {
            Ok(answer.to_string())
        }
    }
}
