//! Gemini client for chat title generation via the Generative Language API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::TitleConfig;
use crate::error::{Error, Result};

use super::http::{build_client, check_status, retry_request};
use super::title::{normalize_title, TitleProvider};

const TITLE_INSTRUCTION: &str = "Generate a short and clean 3-5 word title summarizing this question.
The title must:
- be concise
- not contain punctuation
- not contain quotes
- be title-case (e.g., Visa Requirements USA)";

/// Gemini title generator
pub struct GeminiTitleGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl GeminiTitleGenerator {
    /// Create a new generator; fails when no API key is configured
    pub fn new(config: &TitleConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("title.api_key is not set".to_string()))?;

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(question: &str) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: TITLE_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: question.to_string(),
                }],
            }],
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
    }
}

#[async_trait]
impl TitleProvider for GeminiTitleGenerator {
    async fn generate_title(&self, question: &str) -> Result<String> {
        let body = &Self::request_body(question);

        let parsed: GenerateResponse = retry_request(self.max_retries, || async move {
            let response = self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send()
                .await
                .map_err(|e| Error::Title(format!("Gemini request failed: {}", e)))?;
            let response =
                check_status(response, "Gemini title generation", Error::Title).await?;

            response
                .json()
                .await
                .map_err(|e| Error::Title(format!("Failed to parse Gemini response: {}", e)))
        })
        .await?;

        let raw = parsed
            .text()
            .ok_or_else(|| Error::Title("No candidates in Gemini response".to_string()))?;

        Ok(normalize_title(&raw))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
