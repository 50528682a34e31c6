//! abroad-rag: conversational study-abroad assistant backend
//!
//! Authenticated users keep chat sessions; each question is answered by
//! retrieving document chunks from an external vector store and generating
//! a grounded answer that takes the chat's recent history into account.

pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod providers;
pub mod rag;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use rag::ConversationalChain;
pub use server::{build_router, state::AppState, RagServer};
pub use storage::ChatDb;
pub use types::{ChatMessage, ChatSession, QueryResponse, RetrievedChunk, Role, User};
