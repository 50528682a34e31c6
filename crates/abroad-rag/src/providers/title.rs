//! Title provider trait for naming chat sessions

use async_trait::async_trait;
use crate::error::Result;

/// Trait for summarizing a first question into a short chat title
///
/// Implementations:
/// - `GeminiTitleGenerator`: Gemini generateContent
#[async_trait]
pub trait TitleProvider: Send + Sync {
    /// Produce a normalized 3-5 word title; may be empty if the model returns nothing usable
    async fn generate_title(&self, question: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Strip punctuation and quotes, collapse whitespace and title-case each word
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
