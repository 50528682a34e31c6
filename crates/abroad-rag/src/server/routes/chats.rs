//! Chat session management endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::server::extract::JsonBody;
use crate::server::state::AppState;
use crate::types::{
    query::parse_chat_id, ChatListResponse, CreateChatResponse, MessageResponse,
    MessagesResponse, RenameChatRequest,
};

/// POST /api/chat/create - Start a chat with the placeholder title
pub async fn create_chat(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<CreateChatResponse>> {
    let chat = state
        .db()
        .create_chat(user.user_id, &state.config().rag.default_title)?;

    tracing::info!("Created chat {} for user {}", chat.id, user.user_id);

    Ok(Json(CreateChatResponse {
        chat_id: chat.id,
        message: "Chat created successfully".to_string(),
    }))
}

/// GET /api/chat/list - Caller's chats, newest first
pub async fn list_chats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ChatListResponse>> {
    let chats = state.db().list_chats(user.user_id)?;
    Ok(Json(ChatListResponse { chats }))
}

/// GET /api/chat/messages/:chat_id - Messages in chronological order
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<MessagesResponse>> {
    let chat_id = parse_chat_id(&chat_id)?;
    state.db().require_chat(user.user_id, chat_id)?;

    let messages = state.db().list_messages(chat_id)?;
    Ok(Json(MessagesResponse { messages }))
}

/// POST /api/chat/rename/:chat_id
pub async fn rename_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    JsonBody(request): JsonBody<RenameChatRequest>,
) -> Result<Json<MessageResponse>> {
    let chat_id = parse_chat_id(&chat_id)?;
    let title = request.require()?;

    if !state.db().rename_chat(user.user_id, chat_id, &title)? {
        return Err(Error::not_found("Chat not found"));
    }

    Ok(Json(MessageResponse::new("Chat renamed successfully")))
}

/// DELETE /api/chat/delete/:chat_id - Remove a chat and all of its messages
pub async fn delete_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chat_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let chat_id = parse_chat_id(&chat_id)?;

    if !state.db().delete_chat(user.user_id, chat_id)? {
        return Err(Error::not_found("Chat not found"));
    }

    tracing::info!("Deleted chat {} for user {}", chat_id, user.user_id);

    Ok(Json(MessageResponse::new("Chat deleted successfully")))
}
