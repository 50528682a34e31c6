//! Request bodies
//!
//! Required fields are `Option`s so that a missing field becomes a
//! structured validation error instead of a deserialization rejection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Body of `POST /api/auth/signup` and `POST /api/auth/login`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Return trimmed email and raw password, or a validation error
    pub fn require(&self) -> Result<(String, String)> {
        let email = non_empty(self.email.as_deref()).map(|e| e.to_lowercase());
        let password = self.password.clone().filter(|p| !p.is_empty());
        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(Error::validation("Email and password are required")),
        }
    }
}

/// Body of `POST /api/chat/rename/{chat_id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenameChatRequest {
    #[serde(default)]
    pub new_title: Option<String>,
}

impl RenameChatRequest {
    pub fn require(&self) -> Result<String> {
        non_empty(self.new_title.as_deref())
            .ok_or_else(|| Error::validation("chat_id and new_title are required"))
    }
}

/// Body of `POST /api/chat/querywithrag`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatQueryRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

impl ChatQueryRequest {
    /// Return the parsed chat id and trimmed question
    pub fn require(&self) -> Result<(Uuid, String)> {
        let chat_id = non_empty(self.chat_id.as_deref())
            .ok_or_else(|| Error::validation("chat_id is required"))?;
        let chat_id = parse_chat_id(&chat_id)?;
        let question = non_empty(self.question.as_deref())
            .ok_or_else(|| Error::validation("Please enter a question."))?;
        Ok((chat_id, question))
    }
}

/// Body of `POST /api/chat/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
}

impl QueryRequest {
    pub fn require(&self) -> Result<String> {
        non_empty(self.question.as_deref())
            .ok_or_else(|| Error::validation("Please enter a question."))
    }
}

/// Parse a chat id from a path segment or body field.
///
/// Malformed ids cannot name an existing chat, so they are reported as not found.
pub fn parse_chat_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::not_found("Chat not found"))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
