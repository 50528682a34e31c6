//! Provider abstractions for embeddings, LLM, similarity search and titles
//!
//! Trait-based so the orchestrator can switch between hosted
//! (Hugging Face, Supabase, Gemini) and local (Ollama) backends.

pub mod embedding;
pub mod gemini;
pub mod http;
pub mod huggingface;
pub mod llm;
pub mod ollama;
pub mod supabase;
pub mod title;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::GeminiTitleGenerator;
pub use huggingface::{HuggingFaceEmbedder, HuggingFaceLlm};
pub use llm::LlmProvider;
pub use ollama::{ollama_pair, OllamaClient, OllamaEmbedder, OllamaLlm};
pub use supabase::SupabaseVectorStore;
pub use title::{normalize_title, TitleProvider};
pub use vector_store::VectorStoreProvider;
