// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use edumentor::{
    config::Config,
    routes,
    services::llm::{Embedder, LanguageModel, ModelError},
    state::AppState,
    utils::hash::hash_password,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const FAKE_SUMMARY: &str = "* The Amazon Rainforest produces a large share of the oxygen on Earth.\n\
* Brazil contains most of the Amazon Rainforest and its river basin.\n\
* Deforestation in the Amazon Rainforest threatens thousands of species.";

/// Answers summary prompts with `FAKE_SUMMARY` and chat prompts by quoting
/// the retrieved context.
pub struct FakeModel;

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, _model: &str, prompt: &str) -> Result<String, ModelError> {
        if let Some((_, rest)) = prompt.split_once("Context: ") {
            let context = rest.split("\nQuestion:").next().unwrap_or_default();
            return Ok(format!("According to the document: {}", context.trim()));
        }
        Ok(FAKE_SUMMARY.to_string())
    }
}

/// Letter-frequency vectors: identical texts embed identically.
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.to_ascii_lowercase().bytes() {
                    if c.is_ascii_lowercase() {
                        v[(c - b'a') as usize] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

/// Every call fails as if Ollama were not running.
pub struct DownModel;

#[async_trait]
impl LanguageModel for DownModel {
    async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Network("connection refused".to_string()))
    }
}

#[async_trait]
impl Embedder for DownModel {
    async fn embed(&self, _model: &str, _texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        Err(ModelError::Network("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        ..Config::default()
    }
}

/// Spawns the app on a random port with working fake models.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(FakeModel), Arc::new(FakeEmbedder)).await
}

pub async fn spawn_app_with(
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
) -> TestApp {
    // A single connection that never closes keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState::with_models(pool.clone(), test_config(), llm, embedder);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

pub fn unique_name() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers a fresh student and returns `(username, token)`.
    pub async fn student(&self) -> (String, String) {
        let username = unique_name();
        assert_eq!(self.register(&username, "password123").await.status().as_u16(), 201);
        let token = self.token_for(&username, "password123").await;
        (username, token)
    }

    /// Inserts a teacher directly and returns `(username, token)`.
    pub async fn teacher(&self) -> (String, String) {
        let username = unique_name();
        sqlx::query(
            "INSERT INTO users (username, password, role, created_at) VALUES ($1, $2, 'teacher', $3)",
        )
        .bind(&username)
        .bind(hash_password("password123").unwrap())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .expect("Failed to seed teacher");
        let token = self.token_for(&username, "password123").await;
        (username, token)
    }

    async fn token_for(&self, username: &str, password: &str) -> String {
        let body: serde_json::Value = self
            .login(username, password)
            .await
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    pub fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }
}
