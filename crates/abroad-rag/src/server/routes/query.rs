//! Question answering endpoints

use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::server::extract::JsonBody;
use crate::server::state::AppState;
use crate::types::{ChatQueryRequest, QueryRequest, QueryResponse};

/// POST /api/chat/querywithrag - Answer inside a chat, with history
pub async fn query_with_rag(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<ChatQueryRequest>,
) -> Result<Json<QueryResponse>> {
    let (chat_id, question) = request.require()?;

    tracing::info!("Query in chat {}: \"{}\"", chat_id, question);

    let response = state.chain().ask(user.user_id, chat_id, &question).await?;
    Ok(Json(response))
}

/// POST /api/chat/query - Single-turn answer, nothing stored
pub async fn query(
    State(state): State<AppState>,
    _user: AuthUser,
    JsonBody(request): JsonBody<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let question = request.require()?;

    tracing::info!("Query: \"{}\"", question);

    let response = state.chain().ask_once(&question).await?;
    Ok(Json(response))
}
