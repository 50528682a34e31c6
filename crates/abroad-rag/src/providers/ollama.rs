//! Ollama-based providers for embeddings and LLM
//!
//! A single `OllamaClient` is shared by both providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::generation::ChatPrompt;

use super::embedding::{check_dimensions, EmbeddingProvider};
use super::http::{build_client, check_status, retry_request};
use super::llm::LlmProvider;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Ollama API client with automatic retry
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.url("/api/embeddings");

        retry_request(self.config.max_retries, || {
            let url = &url;
            async move {
                let request = EmbedRequest {
                    model: &self.config.embed_model,
                    prompt: text,
                };

                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;
                let response = check_status(response, "Embedding", Error::Embedding).await?;

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                Ok(embed_response.embedding)
            }
        })
        .await
    }

    /// Generate a completion for a system + user prompt with retry
    pub async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        let url = self.url("/api/generate");

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        retry_request(self.config.max_retries, || {
            let url = &url;
            async move {
                let request = GenerateRequest {
                    model: &self.config.generate_model,
                    system: &prompt.system,
                    prompt: &prompt.user,
                    stream: false,
                    options: GenerateOptions {
                        temperature: self.config.temperature,
                    },
                };

                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;
                let response = check_status(response, "Generation", Error::Llm).await?;

                let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                    Error::llm(format!("Failed to parse generation response: {}", e))
                })?;

                Ok(generate_response.response)
            }
        })
        .await
    }
}

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create from an existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.embed(text).await?;
        check_dimensions(embedding, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from an existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        self.client.generate(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build an embedder and LLM sharing one Ollama client
pub fn ollama_pair(config: &OllamaConfig) -> Result<(OllamaEmbedder, OllamaLlm)> {
    let client = Arc::new(OllamaClient::new(config)?);
    Ok((
        OllamaEmbedder::from_client(Arc::clone(&client), config.dimensions),
        OllamaLlm::from_client(client, config.generate_model.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_shares_config() {
        let (embedder, llm) = ollama_pair(&OllamaConfig::default()).unwrap();
        assert_eq!(embedder.dimensions(), 1024);
        assert_eq!(llm.model(), "llama3.2:3b");
        assert_eq!(llm.name(), "ollama");
    }

    #[test]
    fn test_generate_request_carries_system() {
        let body = serde_json::to_value(GenerateRequest {
            model: "m",
            system: "sys",
            prompt: "Current Question: hi",
            stream: false,
            options: GenerateOptions { temperature: 0.2 },
        })
        .unwrap();
        assert_eq!(body["system"], "sys");
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let client = OllamaClient::new(&OllamaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        assert!(!client.health_check().await.unwrap());
    }
}
