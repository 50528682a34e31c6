//! Prompt assembly for answer generation

pub mod prompt;

pub use prompt::{ChatPrompt, PromptBuilder};
