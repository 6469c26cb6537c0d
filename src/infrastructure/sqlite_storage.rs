//! Relational storage backed by SQLite.
//!
//! Conversations and their messages live in separate tables: updating the
//! conversation list never touches messages, which are written through
//! [`ChatStore::create_messages`].

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection};
use serde_json::{Map, Value};

use crate::domain::{
    AppError, BackendKind, ChatStore, Conversation, Folder, FolderType, Message, Prompt, Result,
    Role,
};

/// Relational chat store.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::database)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(AppError::database)?;

        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::database)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(AppError::database)?;

        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS folders (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                folder_type TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                folder_id TEXT,
                extra TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS messages (
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                PRIMARY KEY (conversation_id, position)
            );

            CREATE TABLE IF NOT EXISTS prompts (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_position
                ON conversations(position);
            ",
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Get messages for a conversation in order.
    pub fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT role, content FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY position ASC",
            )
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([conversation_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(AppError::database)?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content) = row.map_err(AppError::database)?;
            let role: Role = role.parse().map_err(AppError::storage)?;
            messages.push(Message { role, content });
        }

        Ok(messages)
    }

    /// Number of stored message rows.
    #[cfg(test)]
    pub fn message_count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get::<_, i64>(0))
            .map(|n| usize::try_from(n).unwrap_or_default())
            .map_err(AppError::database)
    }
}

impl ChatStore for SqliteStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn folders(&self) -> Result<Vec<Folder>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, folder_type FROM folders ORDER BY position ASC")
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(AppError::database)?;

        let mut folders = Vec::new();
        for row in rows {
            let (id, name, folder_type) = row.map_err(AppError::database)?;
            let folder_type: FolderType = folder_type.parse().map_err(AppError::storage)?;
            folders.push(Folder::new(id, name, folder_type));
        }

        Ok(folders)
    }

    fn update_folders(&mut self, folders: &[Folder]) -> Result<()> {
        let tx = self.conn.transaction().map_err(AppError::database)?;
        tx.execute("DELETE FROM folders", [])
            .map_err(AppError::database)?;

        for (position, folder) in folders.iter().enumerate() {
            tx.execute(
                "INSERT OR REPLACE INTO folders (id, position, name, folder_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &folder.id,
                    position as i64,
                    &folder.name,
                    folder.folder_type.as_str()
                ],
            )
            .map_err(AppError::database)?;
        }

        tx.commit().map_err(AppError::database)
    }

    fn conversations(&self) -> Result<Vec<Conversation>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, folder_id, extra FROM conversations ORDER BY position ASC",
            )
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(AppError::database)?;

        let mut conversations = Vec::new();
        for row in rows {
            let (id, name, folder_id, extra) = row.map_err(AppError::database)?;
            let extra: Map<String, Value> =
                serde_json::from_str(&extra).map_err(AppError::json_parse)?;
            let messages = self.get_messages(&id)?;

            conversations.push(Conversation {
                id,
                name,
                messages,
                folder_id,
                extra,
            });
        }

        Ok(conversations)
    }

    fn update_conversations(&mut self, conversations: &[Conversation]) -> Result<()> {
        let keep: HashSet<&str> = conversations.iter().map(|c| c.id.as_str()).collect();

        let tx = self.conn.transaction().map_err(AppError::database)?;

        let stored: Vec<String> = {
            let mut stmt = tx
                .prepare("SELECT id FROM conversations")
                .map_err(AppError::database)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(AppError::database)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(AppError::database)?;
            ids
        };

        for id in stored.iter().filter(|id| !keep.contains(id.as_str())) {
            tx.execute("DELETE FROM conversations WHERE id = ?1", [id])
                .map_err(AppError::database)?;
        }

        for (position, conversation) in conversations.iter().enumerate() {
            let extra =
                serde_json::to_string(&conversation.extra).map_err(AppError::json_parse)?;
            tx.execute(
                r"
            INSERT INTO conversations (id, position, name, folder_id, extra)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                position = excluded.position,
                name = excluded.name,
                folder_id = excluded.folder_id,
                extra = excluded.extra
            ",
                params![
                    &conversation.id,
                    position as i64,
                    &conversation.name,
                    &conversation.folder_id,
                    extra,
                ],
            )
            .map_err(AppError::database)?;
        }

        tx.commit().map_err(AppError::database)
    }

    fn prompts(&self) -> Result<Vec<Prompt>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM prompts ORDER BY position ASC")
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(AppError::database)?;

        let mut prompts = Vec::new();
        for row in rows {
            let body = row.map_err(AppError::database)?;
            prompts.push(serde_json::from_str(&body).map_err(AppError::json_parse)?);
        }

        Ok(prompts)
    }

    fn update_prompts(&mut self, prompts: &[Prompt]) -> Result<()> {
        let tx = self.conn.transaction().map_err(AppError::database)?;
        tx.execute("DELETE FROM prompts", [])
            .map_err(AppError::database)?;

        for (position, prompt) in prompts.iter().enumerate() {
            let body = serde_json::to_string(prompt).map_err(AppError::json_parse)?;
            tx.execute(
                "INSERT OR REPLACE INTO prompts (id, position, body) VALUES (?1, ?2, ?3)",
                params![&prompt.id, position as i64, body],
            )
            .map_err(AppError::database)?;
        }

        tx.commit().map_err(AppError::database)
    }

    /// Writes the messages of `conversation` as they stand in the merged
    /// `history`.
    ///
    /// When the id was already stored, the stored entry is the one in
    /// `history` and its messages are written back unchanged.
    fn create_messages(
        &mut self,
        conversation: &Conversation,
        messages: &[Message],
        history: &[Conversation],
    ) -> Result<()> {
        let messages = history
            .iter()
            .find(|c| c.id == conversation.id)
            .map_or(messages, |merged| merged.messages.as_slice());

        let tx = self.conn.transaction().map_err(AppError::database)?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            [&conversation.id],
        )
        .map_err(AppError::database)?;

        for (position, message) in messages.iter().enumerate() {
            tx.execute(
                "INSERT INTO messages (conversation_id, position, role, content)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &conversation.id,
                    position as i64,
                    message.role.as_str(),
                    &message.content
                ],
            )
            .map_err(AppError::database)?;
        }

        tx.commit().map_err(AppError::database)?;

        tracing::trace!(
            conversation = %conversation.id,
            messages = messages.len(),
            history = history.len(),
            "Materialized messages"
        );

        Ok(())
    }
}
