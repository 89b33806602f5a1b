// src/state.rs

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    services::{
        document_cache::DocumentCache,
        llm::{Embedder, LanguageModel, ModelError, OllamaClient},
        rag::{RagChatbot, TextSplitter},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub llm: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    pub documents: Arc<Mutex<DocumentCache>>,
    pub chatbot: Arc<RagChatbot>,
}

impl AppState {
    /// Builds the state with an Ollama client for both model seams.
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, ModelError> {
        let client = Arc::new(OllamaClient::new(
            &config.ollama_base_url,
            config.model_timeout_secs,
        )?);
        Ok(Self::with_models(pool, config, client.clone(), client))
    }

    pub fn with_models(
        pool: SqlitePool,
        config: Config,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let chatbot = RagChatbot::new(
            llm.clone(),
            embedder.clone(),
            &config.chatbot_model,
            &config.embedding_model,
            TextSplitter::new(config.chunk_size, config.chunk_overlap),
            config.top_k_chunks,
            config.document_cache_capacity,
        );

        Self {
            pool,
            documents: Arc::new(Mutex::new(DocumentCache::new(
                config.document_cache_capacity,
            ))),
            chatbot: Arc::new(chatbot),
            llm,
            embedder,
            config,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
