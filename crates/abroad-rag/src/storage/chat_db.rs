//! SQLite store for users, chats and chat messages
//!
//! Every chat-scoped read or write takes the owner's id so that a caller can
//! never see or touch another user's chat.

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ChatMessage, ChatSession, Role, User};

/// SQLite-backed credential and chat store
#[derive(Clone)]
pub struct ChatDb {
    conn: Arc<Mutex<Connection>>,
}

impl ChatDb {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (tests and ephemeral runs)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Internal(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_chats_user_id ON chats(user_id, created_at);

            -- seq gives a total order even when timestamps collide
            CREATE TABLE IF NOT EXISTS chat_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_chat_messages_chat_id ON chat_messages(chat_id, seq);
            "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // ==================== Users ====================

    /// Insert a user and return the stored row.
    ///
    /// A duplicate email is reported as [`Error::Conflict`].
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        let conn = self.conn.lock();

        let result = conn
            .query_row(
                r#"
                INSERT INTO users (id, email, password_hash, created_at)
                VALUES (?1, ?2, ?3, ?4)
                RETURNING id, email, password_hash, created_at
                "#,
                params![
                    Uuid::new_v4().to_string(),
                    email,
                    password_hash,
                    timestamp(&Utc::now()),
                ],
                row_to_user,
            );

        match result {
            Ok(user) => Ok(user),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look a user up by email
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();

        let user = conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    // ==================== Chats ====================

    /// Create a chat for `user_id` and return it
    pub fn create_chat(&self, user_id: Uuid, title: &str) -> Result<ChatSession> {
        let conn = self.conn.lock();

        let chat = conn.query_row(
            r#"
            INSERT INTO chats (id, user_id, title, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, user_id, title, created_at
            "#,
            params![
                Uuid::new_v4().to_string(),
                user_id.to_string(),
                title,
                timestamp(&Utc::now()),
            ],
            row_to_chat,
        )?;

        Ok(chat)
    }

    /// Get a chat if it exists and belongs to `user_id`
    pub fn get_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<Option<ChatSession>> {
        let conn = self.conn.lock();

        let chat = conn
            .query_row(
                "SELECT id, user_id, title, created_at FROM chats WHERE id = ?1 AND user_id = ?2",
                params![chat_id.to_string(), user_id.to_string()],
                row_to_chat,
            )
            .optional()?;

        Ok(chat)
    }

    /// Like [`get_chat`](Self::get_chat) but absent chats become [`Error::NotFound`]
    pub fn require_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<ChatSession> {
        self.get_chat(user_id, chat_id)?
            .ok_or_else(|| Error::not_found("Chat not found"))
    }

    /// List a user's chats, newest first
    pub fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatSession>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, title, created_at FROM chats
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )?;

        let chats = stmt
            .query_map(params![user_id.to_string()], row_to_chat)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chats)
    }

    /// Set a chat's title. Returns `false` if the chat is absent or not owned.
    pub fn rename_chat(&self, user_id: Uuid, chat_id: Uuid, title: &str) -> Result<bool> {
        let conn = self.conn.lock();

        let count = conn.execute(
            "UPDATE chats SET title = ?1 WHERE id = ?2 AND user_id = ?3",
            params![title, chat_id.to_string(), user_id.to_string()],
        )?;

        Ok(count > 0)
    }

    /// Delete a chat and all of its messages in one transaction.
    /// Returns `false` if the chat is absent or not owned.
    pub fn delete_chat(&self, user_id: Uuid, chat_id: Uuid) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let owned = tx
            .query_row(
                "SELECT 1 FROM chats WHERE id = ?1 AND user_id = ?2",
                params![chat_id.to_string(), user_id.to_string()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if !owned {
            return Ok(false);
        }

        let removed = tx.execute(
            "DELETE FROM chat_messages WHERE chat_id = ?1",
            params![chat_id.to_string()],
        )?;
        tx.execute("DELETE FROM chats WHERE id = ?1", params![chat_id.to_string()])?;
        tx.commit()?;

        tracing::debug!("Deleted chat {} and {} messages", chat_id, removed);
        Ok(true)
    }

    // ==================== Messages ====================

    /// All messages of a chat, oldest first
    pub fn list_messages(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, chat_id, role, content, created_at FROM chat_messages
            WHERE chat_id = ?1
            ORDER BY seq ASC
            "#,
        )?;

        let messages = stmt
            .query_map(params![chat_id.to_string()], row_to_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    /// The last `limit` messages of a chat, oldest first
    pub fn recent_messages(&self, chat_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, chat_id, role, content, created_at FROM (
                SELECT seq, id, chat_id, role, content, created_at FROM chat_messages
                WHERE chat_id = ?1
                ORDER BY seq DESC
                LIMIT ?2
            )
            ORDER BY seq ASC
            "#,
        )?;

        let messages = stmt
            .query_map(params![chat_id.to_string(), limit as i64], row_to_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(messages)
    }

    /// Append a question and its answer as two consecutive messages.
    ///
    /// The chat is re-checked inside the transaction, so a chat deleted (or
    /// never owned) since the caller last looked yields [`Error::NotFound`].
    pub fn append_exchange(
        &self,
        user_id: Uuid,
        chat_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<(ChatMessage, ChatMessage)> {
        let user_msg = ChatMessage::new(chat_id, Role::User, question);
        let assistant_msg = ChatMessage::new(chat_id, Role::Assistant, answer);

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let owned = tx
            .query_row(
                "SELECT 1 FROM chats WHERE id = ?1 AND user_id = ?2",
                params![chat_id.to_string(), user_id.to_string()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !owned {
            return Err(Error::not_found("Chat not found"));
        }

        for msg in [&user_msg, &assistant_msg] {
            insert_message(&tx, msg)?;
        }
        tx.commit()?;

        Ok((user_msg, assistant_msg))
    }

    /// Number of messages stored for a chat
    pub fn count_messages(&self, chat_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE chat_id = ?1",
            params![chat_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }
}

// ==================== Row mapping ====================

fn insert_message(conn: &Connection, msg: &ChatMessage) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO chat_messages (id, chat_id, role, content, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            msg.id.to_string(),
            msg.chat_id.to_string(),
            msg.role.as_str(),
            msg.content,
            timestamp(&msg.created_at),
        ],
    )?;
    Ok(())
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to parse timestamp '{}': {}; using now", raw, e);
            Utc::now()
        })
}

fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(3)?;

    Ok(User {
        id: parse_uuid(0, &id)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_chat(row: &rusqlite::Row) -> rusqlite::Result<ChatSession> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let created_at: String = row.get(3)?;

    Ok(ChatSession {
        id: parse_uuid(0, &id)?,
        user_id: parse_uuid(1, &user_id)?,
        title: row.get(2)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
    let id: String = row.get(0)?;
    let chat_id: String = row.get(1)?;
    let role: String = row.get(2)?;
    let created_at: String = row.get(4)?;

    Ok(ChatMessage {
        id: parse_uuid(0, &id)?,
        chat_id: parse_uuid(1, &chat_id)?,
        role: Role::parse(&role),
        content: row.get(3)?,
        created_at: parse_timestamp(&created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user() -> (ChatDb, User) {
        let db = ChatDb::in_memory().unwrap();
        let user = db.create_user("student@example.com", "hash").unwrap();
        (db, user)
    }

    #[test]
    fn test_create_user_and_duplicate() {
        let (db, user) = db_with_user();
        assert_eq!(user.email, "student@example.com");

        let found = db.find_user_by_email("student@example.com").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let dup = db.create_user("student@example.com", "other");
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_chat_ownership() {
        let (db, owner) = db_with_user();
        let other = db.create_user("other@example.com", "hash").unwrap();
        let chat = db.create_chat(owner.id, "New Chat").unwrap();

        assert!(db.get_chat(owner.id, chat.id).unwrap().is_some());
        assert!(db.get_chat(other.id, chat.id).unwrap().is_none());
        assert!(!db.rename_chat(other.id, chat.id, "Hijacked").unwrap());
        assert!(!db.delete_chat(other.id, chat.id).unwrap());
        assert_eq!(db.require_chat(owner.id, chat.id).unwrap().title, "New Chat");
    }

    #[test]
    fn test_list_chats_newest_first() {
        let (db, user) = db_with_user();
        let first = db.create_chat(user.id, "New Chat").unwrap();
        let second = db.create_chat(user.id, "New Chat").unwrap();

        let chats = db.list_chats(user.id).unwrap();
        let ids: Vec<Uuid> = chats.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_delete_chat_removes_messages() {
        let (db, user) = db_with_user();
        let chat = db.create_chat(user.id, "New Chat").unwrap();
        let keep = db.create_chat(user.id, "New Chat").unwrap();
        db.append_exchange(user.id, chat.id, "q1", "a1").unwrap();
        db.append_exchange(user.id, keep.id, "q2", "a2").unwrap();

        assert!(db.delete_chat(user.id, chat.id).unwrap());
        assert_eq!(db.count_messages(chat.id).unwrap(), 0);
        assert_eq!(db.count_messages(keep.id).unwrap(), 2);
        assert!(db.get_chat(user.id, chat.id).unwrap().is_none());
    }

    #[test]
    fn test_recent_messages_are_last_n_oldest_first() {
        let (db, user) = db_with_user();
        let chat = db.create_chat(user.id, "New Chat").unwrap();
        for i in 0..6 {
            db.append_exchange(user.id, chat.id, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }

        let recent = db.recent_messages(chat.id, 4).unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q4", "a4", "q5", "a5"]);
        assert_eq!(recent[0].role, Role::User);

        assert_eq!(db.list_messages(chat.id).unwrap().len(), 12);
    }

    #[test]
    fn test_append_to_deleted_or_foreign_chat_is_not_found() {
        let (db, owner) = db_with_user();
        let other = db.create_user("other@example.com", "hash").unwrap();
        let chat = db.create_chat(owner.id, "New Chat").unwrap();

        let foreign = db.append_exchange(other.id, chat.id, "q", "a");
        assert!(matches!(foreign, Err(Error::NotFound(_))));

        assert!(db.delete_chat(owner.id, chat.id).unwrap());
        let deleted = db.append_exchange(owner.id, chat.id, "q", "a");
        assert!(matches!(deleted, Err(Error::NotFound(_))));
        assert_eq!(db.count_messages(chat.id).unwrap(), 0);
    }

    #[test]
    fn test_reopen_persists_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");

        let chat_id = {
            let db = ChatDb::new(&path).unwrap();
            let user = db.create_user("persist@example.com", "hash").unwrap();
            let chat = db.create_chat(user.id, "New Chat").unwrap();
            db.append_exchange(user.id, chat.id, "q", "a").unwrap();
            chat.id
        };

        let db = ChatDb::new(&path).unwrap();
        assert!(db.find_user_by_email("persist@example.com").unwrap().is_some());
        assert_eq!(db.count_messages(chat_id).unwrap(), 2);
    }
}
