//! Hugging Face hosted inference: feature-extraction embeddings and
//! router chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::generation::ChatPrompt;

use super::embedding::{check_dimensions, EmbeddingProvider};
use super::http::{build_client, check_status, retry_request};
use super::llm::LlmProvider;

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

/// The pipeline returns a flat vector for a single input, but some
/// deployments wrap it in a batch
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Single(Vec<f32>),
    Batch(Vec<Vec<f32>>),
}

impl FeatureExtractionResponse {
    fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            Self::Single(v) => Some(v),
            Self::Batch(batch) => batch.into_iter().next(),
        }
    }
}

/// Sentence-transformer embeddings via the Hugging Face inference router
pub struct HuggingFaceEmbedder {
    client: Client,
    url: String,
    api_token: Option<String>,
    dimensions: usize,
    max_retries: u32,
}

impl HuggingFaceEmbedder {
    /// Create a new embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: format!(
                "{}/{}/pipeline/feature-extraction",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_token: config.api_token.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = retry_request(self.max_retries, || async move {
            let mut request = self
                .client
                .post(&self.url)
                .json(&FeatureExtractionRequest { inputs: text });
            if let Some(token) = &self.api_token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;
            let response = check_status(response, "Embedding", Error::Embedding).await?;

            let parsed: FeatureExtractionResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            parsed
                .into_vector()
                .ok_or_else(|| Error::embedding("Empty embedding response"))
        })
        .await?;

        check_dimensions(embedding, self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        // Probing the pipeline costs a billed inference call
        Ok(self.api_token.is_some())
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completion LLM via the Hugging Face router (OpenAI-compatible)
pub struct HuggingFaceLlm {
    client: Client,
    url: String,
    config: LlmConfig,
}

impl HuggingFaceLlm {
    /// Create a new chat-completion client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            config: config.clone(),
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a ChatPrompt) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatCompletionMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatCompletionMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.config.max_new_tokens,
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceLlm {
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.config.model);

        retry_request(self.config.max_retries, || async move {
            let mut request = self.client.post(&self.url).json(&self.request_body(prompt));
            if let Some(token) = &self.config.api_token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;
            let response = check_status(response, "Generation", Error::Llm).await?;

            let completion: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse generation response: {}", e)))?;

            completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Error::llm("No text in generation response"))
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.config.api_token.is_some())
    }

    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
