//! Response bodies

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::{ChatMessage, ChatSession, UserSummary};

/// A chunk returned by the similarity search service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    /// Row id in the external store, when provided
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Chunk text
    pub content: String,
    /// Similarity score, when provided
    #[serde(default)]
    pub similarity: Option<f32>,
    /// Country tag attached at ingestion, when provided
    #[serde(default)]
    pub country: Option<String>,
}

impl RetrievedChunk {
    /// Chunk with only text content
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            similarity: None,
            country: None,
        }
    }
}

/// Answer plus the chunk texts it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Source chunk texts in rank order
    pub sources: Vec<String>,
}

impl QueryResponse {
    /// Create a new response
    pub fn new(answer: String, sources: Vec<String>) -> Self {
        Self { answer, sources }
    }

    /// Response used when retrieval finds nothing
    pub fn not_found(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }
}

/// Signup / login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

/// `POST /api/chat/create` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChatResponse {
    pub chat_id: Uuid,
    pub message: String,
}

/// `GET /api/chat/list` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSession>,
}

/// `GET /api/chat/messages/{chat_id}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

/// Plain confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_tolerates_extra_columns() {
        let rows: Vec<RetrievedChunk> = serde_json::from_str(
            r#"[
                {"id": 12, "content": "USA visa: F-1", "similarity": 0.83, "country": "USA", "embedding": null},
                {"content": "UK visa: Student route"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country.as_deref(), Some("USA"));
        assert_eq!(rows[1].similarity, None);
    }

    #[test]
    fn test_not_found_has_no_sources() {
        let response = QueryResponse::not_found("No relevant content found in the documents.");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["sources"], serde_json::json!([]));
    }
}
