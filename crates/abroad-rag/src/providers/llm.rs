//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;
use crate::generation::ChatPrompt;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `HuggingFaceLlm`: Hugging Face router chat completions (Qwen3-8B)
/// - `OllamaLlm`: Local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate raw answer text for an assembled prompt
    async fn generate(&self, prompt: &ChatPrompt) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
