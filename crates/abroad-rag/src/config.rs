//! Configuration for the chatbot backend

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "ABROAD_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Backend provider for embeddings and generation (hosted or local)
    #[serde(default)]
    pub backend: BackendProvider,
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Token and password hashing configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Chat store configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Embedding service configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Answer generation configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Chat title generation configuration
    #[serde(default)]
    pub title: TitleConfig,
    /// Similarity search configuration
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    /// Conversational chain tunables
    #[serde(default)]
    pub rag: ChainConfig,
    /// Local (Ollama) backend configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl RagConfig {
    /// Load configuration: optional TOML file, then environment overrides.
    ///
    /// The file path comes from `ABROAD_RAG_CONFIG`; when unset, defaults are used.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Override fields from well-known environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = env_var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = env_var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(path) = env_var("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(secret) = env_var("JWT_SECRET_KEY") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = env_var("SUPABASE_URL") {
            self.vector_store.url = url;
        }
        if let Some(key) = env_var("SUPABASE_SERVICE_ROLE_KEY") {
            self.vector_store.api_key = key;
        }
        if let Some(token) = env_var("HUGGINGFACEHUB_API_TOKEN") {
            self.embeddings.api_token = Some(token.clone());
            self.llm.api_token = Some(token);
        }
        if let Some(key) = env_var("GEMINI_API_KEY").or_else(|| env_var("GOOGLE_API_KEY")) {
            self.title.api_key = Some(key);
        }
        if let Some(url) = env_var("OLLAMA_BASE_URL") {
            self.ollama.base_url = url;
        }
        if let Some(backend) = env_var("RAG_BACKEND") {
            match backend.to_lowercase().as_str() {
                "local" => self.backend = BackendProvider::Local,
                "hosted" => self.backend = BackendProvider::Hosted,
                other => tracing::warn!("Ignoring unknown RAG_BACKEND '{}'", other),
            }
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(Error::Config(
                "JWT secret is not set (JWT_SECRET_KEY or auth.jwt_secret)".to_string(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(Error::Config("rag.top_k must be at least 1".to_string()));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(Error::Config(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        Ok(())
    }

    /// Socket address string for the HTTP server
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            cors_origins: vec![
                "https://study-abroad-rag-ai-frontend-ek2i.vercel.app".to_string(),
                "https://study-abroad-rag-ai-frontend-ek2i-fay6su70g.vercel.app".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

/// Token service and password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens; must come from `JWT_SECRET_KEY` or the file
    #[serde(default)]
    pub jwt_secret: String,
    /// Token lifetime in minutes
    pub token_ttl_minutes: i64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_minutes: 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Chat store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("abroad-rag.db"),
        }
    }
}

/// Embedding service configuration (Hugging Face inference)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Inference API base URL
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// API token
    #[serde(default)]
    pub api_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            api_token: None,
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

/// Answer generation configuration (Hugging Face chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_new_tokens: u32,
    /// API token
    #[serde(default)]
    pub api_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co/v1".to_string(),
            model: "Qwen/Qwen3-8B".to_string(),
            temperature: 0.2,
            max_new_tokens: 250,
            api_token: None,
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

/// Chat title generation configuration (Gemini)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Generative Language API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key; title generation falls back to the placeholder when absent
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            timeout_secs: 20,
            max_retries: 0,
        }
    }
}

/// Similarity search configuration (Supabase RPC)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Service role key
    pub api_key: String,
    /// Name of the SQL matching function exposed over RPC
    pub match_function: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            match_function: "match_documentsssss".to_string(),
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

/// Conversational chain tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of chunks to retrieve
    pub top_k: usize,
    /// Number of prior messages fed back as history
    pub history_limit: usize,
    /// Placeholder title for fresh chats
    pub default_title: String,
    /// Answer returned when retrieval finds nothing
    pub no_match_answer: String,
    /// Optional country filter passed to the matching function
    #[serde(default)]
    pub country_filter: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            history_limit: 10,
            default_title: "New Chat".to_string(),
            no_match_answer: "No relevant content found in the documents.".to_string(),
            country_filter: None,
        }
    }
}

/// Local Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "mxbai-embed-large:latest".to_string(),
            dimensions: 1024,
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

/// Backend provider selection for embeddings and generation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Hugging Face hosted inference
    #[default]
    Hosted,
    /// Local Ollama server
    Local,
}
