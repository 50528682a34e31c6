//! Application state for the chatbot server

use axum::extract::FromRef;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::{BackendProvider, RagConfig};
use crate::error::Result;
use crate::providers::{
    ollama_pair, EmbeddingProvider, GeminiTitleGenerator, HuggingFaceEmbedder, HuggingFaceLlm,
    LlmProvider, SupabaseVectorStore, TitleProvider, VectorStoreProvider,
};
use crate::rag::ConversationalChain;
use crate::storage::ChatDb;

/// External collaborators injected into the chain
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub titles: Option<Arc<dyn TitleProvider>>,
}

impl Providers {
    /// Build providers for the configured backend
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let (embedder, llm): (Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>) =
            match config.backend {
                BackendProvider::Hosted => {
                    tracing::info!(
                        "Using hosted backend (embeddings: {}, llm: {})",
                        config.embeddings.model,
                        config.llm.model
                    );
                    (
                        Arc::new(HuggingFaceEmbedder::new(&config.embeddings)?),
                        Arc::new(HuggingFaceLlm::new(&config.llm)?),
                    )
                }
                BackendProvider::Local => {
                    tracing::info!(
                        "Using local backend (Ollama at {}, llm: {})",
                        config.ollama.base_url,
                        config.ollama.generate_model
                    );
                    let (embedder, llm) = ollama_pair(&config.ollama)?;
                    (Arc::new(embedder), Arc::new(llm))
                }
            };

        let vector_store = Arc::new(SupabaseVectorStore::new(
            &config.vector_store,
            config.rag.country_filter.clone(),
        )?);

        let titles: Option<Arc<dyn TitleProvider>> = match GeminiTitleGenerator::new(&config.title) {
            Ok(generator) => Some(Arc::new(generator)),
            Err(e) => {
                tracing::warn!("Chat titles disabled: {}", e);
                None
            }
        };

        Ok(Self {
            embedder,
            vector_store,
            llm,
            titles,
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Users, chats and messages
    db: ChatDb,
    /// Bearer token issuer / verifier
    tokens: Arc<TokenService>,
    /// Conversational query orchestrator
    chain: ConversationalChain,
    /// Providers kept for readiness checks
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Create application state from configuration, opening the database
    /// and connecting the configured providers
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state (backend: {:?})...", config.backend);
        config.validate()?;

        let db = ChatDb::new(&config.database.path)?;
        tracing::info!("Chat database opened at {}", config.database.path.display());

        let providers = Providers::from_config(&config)?;
        Ok(Self::with_providers(config, db, providers))
    }

    /// Create application state from already-built collaborators
    pub fn with_providers(config: RagConfig, db: ChatDb, providers: Providers) -> Self {
        let tokens = Arc::new(TokenService::new(&config.auth));

        let mut chain = ConversationalChain::new(
            db.clone(),
            Arc::clone(&providers.embedder),
            Arc::clone(&providers.vector_store),
            Arc::clone(&providers.llm),
            config.rag.clone(),
        );
        if let Some(titles) = providers.titles {
            chain = chain.with_titles(titles);
        }

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                tokens,
                chain,
                embedder: providers.embedder,
                vector_store: providers.vector_store,
                llm: providers.llm,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get chat database
    pub fn db(&self) -> &ChatDb {
        &self.inner.db
    }

    /// Get token service
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.inner.tokens
    }

    /// Get conversational chain
    pub fn chain(&self) -> &ConversationalChain {
        &self.inner.chain
    }

    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn vector_store_provider(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.vector_store
    }

    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.inner.tokens)
    }
}
