//! Core types for the chatbot backend

pub mod chat;
pub mod query;
pub mod response;

pub use chat::{ChatMessage, ChatSession, Role, User, UserSummary};
pub use query::{ChatQueryRequest, CredentialsRequest, QueryRequest, RenameChatRequest};
pub use response::{
    AuthResponse, ChatListResponse, CreateChatResponse, MessageResponse, MessagesResponse,
    QueryResponse, RetrievedChunk,
};
