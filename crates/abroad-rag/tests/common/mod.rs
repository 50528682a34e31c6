//! Shared fixtures: an in-memory app with scripted providers

#![allow(dead_code)]

use abroad_rag::{
    build_router,
    generation::ChatPrompt,
    providers::{EmbeddingProvider, LlmProvider, TitleProvider, VectorStoreProvider},
    server::state::Providers,
    AppState, ChatDb, Error, RagConfig, Result, RetrievedChunk,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct StaticEmbedder {
    pub fail: bool,
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::embedding("inference endpoint unavailable"));
        }
        Ok(vec![0.0; 384])
    }

    fn dimensions(&self) -> usize {
        384
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub struct StaticStore {
    pub chunks: Vec<String>,
    pub fail: bool,
}

#[async_trait]
impl VectorStoreProvider for StaticStore {
    async fn search(&self, _embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if self.fail {
            return Err(Error::vector_store("match function timed out"));
        }
        Ok(self
            .chunks
            .iter()
            .take(top_k)
            .map(|c| RetrievedChunk::from_content(c.as_str()))
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Echoes the question back so tests can tell answers apart
pub struct EchoLlm {
    pub fail: bool,
}

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        if self.fail {
            return Err(Error::llm("model is overloaded"));
        }
        let question = prompt
            .user
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("Current Question: ");
        Ok(format!("<think>planning</think>Answer to: {}", question))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-1"
    }
}

pub struct StaticTitles;

#[async_trait]
impl TitleProvider for StaticTitles {
    async fn generate_title(&self, _question: &str) -> Result<String> {
        Ok("Visa Requirements USA".to_string())
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: ChatDb,
}

pub struct Options {
    pub chunks: Vec<&'static str>,
    pub embed_fails: bool,
    pub search_fails: bool,
    pub generate_fails: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chunks: vec!["USA visa: international students need an F-1 visa."],
            embed_fails: false,
            search_fails: false,
            generate_fails: false,
        }
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let mut config = RagConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.auth.bcrypt_cost = 4;

        let db = ChatDb::in_memory().expect("in-memory database");
        let providers = Providers {
            embedder: Arc::new(StaticEmbedder {
                fail: options.embed_fails,
            }),
            vector_store: Arc::new(StaticStore {
                chunks: options.chunks.into_iter().map(str::to_string).collect(),
                fail: options.search_fails,
            }),
            llm: Arc::new(EchoLlm {
                fail: options.generate_fails,
            }),
            titles: Some(Arc::new(StaticTitles)),
        };

        let state = AppState::with_providers(config, db.clone(), providers);
        Self {
            router: build_router(state),
            db,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        (status, json)
    }

    /// Sign up and return the bearer token
    pub async fn signup(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {}", body);
        body["token"].as_str().expect("token").to_string()
    }

    /// Create a chat and return its id
    pub async fn create_chat(&self, token: &str) -> String {
        let (status, body) = self
            .request(Method::POST, "/api/chat/create", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body["chat_id"].as_str().expect("chat_id").to_string()
    }
}
