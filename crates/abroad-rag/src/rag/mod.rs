//! Conversational retrieval-augmented answering

pub mod chain;

pub use chain::ConversationalChain;
