//! Vector store provider trait for similarity search over document chunks

use async_trait::async_trait;
use crate::error::Result;
use crate::types::RetrievedChunk;

/// Trait for similarity search against an externally managed chunk index
///
/// Implementations:
/// - `SupabaseVectorStore`: PostgREST RPC match function
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Return up to `top_k` chunks nearest to the embedding, best first
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
