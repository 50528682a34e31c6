//! API routes for the chatbot server

pub mod auth;
pub mod chats;
pub mod query;

use axum::{
    routing::{delete, get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        // Chat sessions
        .route("/chat/create", post(chats::create_chat))
        .route("/chat/list", get(chats::list_chats))
        .route("/chat/messages/:chat_id", get(chats::list_messages))
        .route("/chat/rename/:chat_id", post(chats::rename_chat))
        .route("/chat/delete/:chat_id", delete(chats::delete_chat))
        // Query
        .route("/chat/querywithrag", post(query::query_with_rag))
        .route("/chat/query", post(query::query))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "abroad-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Study-abroad chatbot with retrieval-augmented, conversational answers",
        "endpoints": {
            "POST /api/auth/signup": "Create an account and receive a token",
            "POST /api/auth/login": "Exchange credentials for a token",
            "POST /api/chat/create": "Start a new chat",
            "GET /api/chat/list": "List your chats, newest first",
            "GET /api/chat/messages/:chat_id": "Messages of a chat in order",
            "POST /api/chat/rename/:chat_id": "Rename a chat",
            "DELETE /api/chat/delete/:chat_id": "Delete a chat and its messages",
            "POST /api/chat/querywithrag": "Ask within a chat, using its history",
            "POST /api/chat/query": "Ask a single stateless question"
        }
    }))
}
