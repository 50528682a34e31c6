//! Prompt templates for conversational RAG generation

use crate::types::{ChatMessage, RetrievedChunk};

const SYSTEM_PREAMBLE: &str = r#"You are a helpful and knowledgeable study abroad assistant specializing in visa requirements,
educational opportunities, and travel information for students planning to study internationally.

Your role is to:
- Provide accurate, clear, and concise answers based on the provided context documents
- Reference previous conversation context when relevant to maintain continuity
- Be friendly, professional, and supportive
- If information is not available in the provided context, clearly state: "I don't have that information in the provided documents. Please consult official sources or contact the relevant embassy." Then answer the question from your general knowledge and say that it does not come from the provided documents.

Guidelines:
- Use the context documents as your primary source of information
- Consider the conversation history to provide contextually relevant answers
- Keep answers focused and avoid unnecessary repetition
- If asked about something not in the context, politely indicate the limitation, then answer from your general knowledge while making clear it is not from the provided documents."#;

const HUMAN_TEMPLATE: &str = r#"Current Question: {question}

Please provide a helpful answer based on the context above and the conversation history."#;

/// A two-message chat prompt (system + human)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

impl ChatPrompt {
    /// Collapse into a single completion-style prompt for backends without chat roles
    pub fn flatten(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Prompt builder for conversational queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts into a context block, preserving rank order
    pub fn build_context(chunks: &[RetrievedChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render prior messages as `User: ...` / `Assistant: ...` lines
    pub fn render_transcript(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the system + human prompt pair
    pub fn build_chat_prompt(chat_history: &str, context: &str, question: &str) -> ChatPrompt {
        let system = format!(
            "{}\n\nPrevious Conversation:\n{}\n\nRelevant Context from Documents:\n{}",
            SYSTEM_PREAMBLE, chat_history, context
        );

        ChatPrompt {
            system,
            user: HUMAN_TEMPLATE.replace("{question}", question),
        }
    }

    /// Strip `<think>...</think>` reasoning blocks and surrounding whitespace
    pub fn clean_answer(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(start) = rest.find("<think>") {
            out.push_str(&rest[..start]);
            // An unterminated block swallows the remainder
            rest = match rest[start..].find("</think>") {
                Some(end) => &rest[start + end + "</think>".len()..],
                None => "",
            };
        }
        out.push_str(rest);

        out.trim().to_string()
    }
}
