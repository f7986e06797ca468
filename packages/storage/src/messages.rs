// ABOUTME: Conversation message storage
// ABOUTME: Append-only history of user instructions and assistant replies per session

use chrono::{DateTime, Utc};
use prdsmith_core::{generate_id, Message, MessageRole};
use sqlx::{FromRow, SqlitePool};

use crate::{StorageError, StorageResult};

#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StorageError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role: MessageRole = row
            .role
            .parse()
            .map_err(|e: prdsmith_core::ParseEnumError| StorageError::InvalidData(e.to_string()))?;
        Ok(Message {
            id: row.id,
            session_id: row.session_id,
            role,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

pub struct MessageStorage {
    pool: SqlitePool,
}

impl MessageStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> StorageResult<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, session_id, role, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(generate_id())
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Messages of a session in the order they were appended
    pub async fn list_for_session(&self, session_id: &str) -> StorageResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE session_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }
}
