//! Similarity search through a Supabase (PostgREST) RPC match function

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use crate::config::VectorStoreConfig;
use crate::error::{Error, Result};
use crate::types::RetrievedChunk;

use super::http::{build_client, check_status, retry_request};
use super::vector_store::VectorStoreProvider;

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_filter: Option<&'a str>,
}

/// Vector store backed by a `pgvector` match function exposed over PostgREST
pub struct SupabaseVectorStore {
    client: Client,
    base_url: String,
    api_key: String,
    match_function: String,
    country_filter: Option<String>,
    max_retries: u32,
}

impl SupabaseVectorStore {
    /// Create a new store client; `country_filter` narrows every search when set
    pub fn new(config: &VectorStoreConfig, country_filter: Option<String>) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Config("vector_store.url is not set".to_string()));
        }

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            match_function: config.match_function.clone(),
            country_filter,
            max_retries: config.max_retries,
        })
    }

    fn rpc_url(&self) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, self.match_function)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl VectorStoreProvider for SupabaseVectorStore {
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let body = &MatchRequest {
            query_embedding,
            match_count: top_k,
            country_filter: self.country_filter.as_deref(),
        };

        let mut chunks: Vec<RetrievedChunk> = retry_request(self.max_retries, || async move {
            let response = self
                .authorized(self.client.post(self.rpc_url()))
                .json(body)
                .send()
                .await
                .map_err(|e| Error::vector_store(format!("Search request failed: {}", e)))?;
            let response = check_status(response, "Search", Error::VectorStore).await?;

            response
                .json()
                .await
                .map_err(|e| Error::vector_store(format!("Failed to parse search response: {}", e)))
        })
        .await?;
        chunks.truncate(top_k);

        tracing::debug!("Vector search returned {} chunks", chunks.len());
        Ok(chunks)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/rest/v1/", self.base_url);

        match self.authorized(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
