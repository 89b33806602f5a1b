// src/config.rs

use std::{env, str::FromStr};

use dotenvy::dotenv;
use url::Url;

/// Default number of MCQs generated per summary.
pub const DEFAULT_MAX_MCQS: usize = 5;

/// Hard upper bound for `num_questions` in a single request.
pub const MCQ_REQUEST_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub bind_addr: String,
    pub static_dir: String,
    pub cors_origins: Vec<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    pub ollama_base_url: String,
    pub processing_model: String,
    pub chatbot_model: String,
    pub embedding_model: String,
    pub model_timeout_secs: u64,

    pub max_mcqs: usize,
    pub top_k_chunks: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub summary_chunk_words: usize,
    pub document_cache_capacity: usize,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://edumentor.db".to_string(),
            jwt_secret: String::new(),
            jwt_expiration: 60 * 60 * 24,
            rust_log: "info".to_string(),
            log_dir: "logs".to_string(),
            bind_addr: "0.0.0.0:5000".to_string(),
            static_dir: "static".to_string(),
            cors_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
            admin_username: None,
            admin_password: None,
            ollama_base_url: "http://localhost:11434".to_string(),
            processing_model: "llama3.2".to_string(),
            chatbot_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            model_timeout_secs: 300,
            max_mcqs: DEFAULT_MAX_MCQS,
            top_k_chunks: 3,
            chunk_size: 1000,
            chunk_overlap: 100,
            summary_chunk_words: 2000,
            document_cache_capacity: 50,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Config::default();

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let ollama_base_url = env_or("OLLAMA_BASE_URL", defaults.ollama_base_url);
        Url::parse(&ollama_base_url).expect("OLLAMA_BASE_URL must be a valid URL");

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        let chunk_size = parse_or("CHUNK_SIZE", defaults.chunk_size).max(1);
        let chunk_overlap = parse_or("CHUNK_OVERLAP", defaults.chunk_overlap).min(chunk_size - 1);

        Self {
            database_url: env_or("DATABASE_URL", defaults.database_url),
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", defaults.jwt_expiration),
            rust_log: env_or("RUST_LOG", defaults.rust_log),
            log_dir: env_or("LOG_DIR", defaults.log_dir),
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            static_dir: env_or("STATIC_DIR", defaults.static_dir),
            cors_origins,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            ollama_base_url,
            processing_model: env_or("PROCESSING_MODEL", defaults.processing_model),
            chatbot_model: env_or("CHATBOT_MODEL", defaults.chatbot_model),
            embedding_model: env_or("EMBEDDING_MODEL", defaults.embedding_model),
            model_timeout_secs: parse_or("MODEL_TIMEOUT_SECS", defaults.model_timeout_secs),
            max_mcqs: parse_or("MAX_MCQS", defaults.max_mcqs).min(MCQ_REQUEST_LIMIT),
            top_k_chunks: parse_or("TOP_K_CHUNKS", defaults.top_k_chunks).max(1),
            chunk_size,
            chunk_overlap,
            summary_chunk_words: parse_or("SUMMARY_CHUNK_WORDS", defaults.summary_chunk_words).max(1),
            document_cache_capacity: parse_or(
                "DOCUMENT_CACHE_CAPACITY",
                defaults.document_cache_capacity,
            )
            .max(1),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

/// Falls back to the default (with a warning) when the value does not parse.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
