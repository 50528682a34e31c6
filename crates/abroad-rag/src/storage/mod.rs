//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for users, chat sessions and messages.

mod chat_db;

pub use chat_db::ChatDb;
