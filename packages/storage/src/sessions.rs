// ABOUTME: Session storage operations
// ABOUTME: Create, list, update and cascade-delete PRD sessions

use chrono::{DateTime, Utc};
use prdsmith_core::{generate_id, PrdSummary, Session, SessionStep, SessionSummary};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::{StorageError, StorageResult};

#[derive(Debug, FromRow)]
struct SessionRow {
    id: String,
    title: String,
    current_step: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let current_step = u8::try_from(row.current_step)
            .ok()
            .and_then(|step| SessionStep::try_from(step).ok())
            .ok_or_else(|| {
                StorageError::InvalidData(format!("session step {}", row.current_step))
            })?;

        Ok(Session {
            id: row.id,
            title: row.title,
            current_step,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SessionListRow {
    #[sqlx(flatten)]
    session: SessionRow,
    prd_id: Option<String>,
    prd_title: Option<String>,
    prd_description: Option<String>,
}

pub struct SessionStorage {
    pool: SqlitePool,
}

impl SessionStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, title: &str) -> StorageResult<Session> {
        let id = generate_id();
        let now = Utc::now();

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, title, current_step, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(title)
        .bind(u8::from(SessionStep::Draft) as i64)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!("Created session {}", id);
        row.try_into()
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<Session>> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    /// Like `get`, but a missing session is an error
    pub async fn require(&self, id: &str) -> StorageResult<Session> {
        self.get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Session {}", id)))
    }

    /// All sessions, most recently updated first, with their PRD headline
    pub async fn list(&self) -> StorageResult<Vec<SessionSummary>> {
        let rows = sqlx::query_as::<_, SessionListRow>(
            r#"
            SELECT s.id, s.title, s.current_step, s.created_at, s.updated_at,
                   p.id AS prd_id, p.title AS prd_title, p.description AS prd_description
            FROM sessions s
            LEFT JOIN prds p ON p.session_id = s.id
            ORDER BY s.updated_at DESC, s.rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let prd = match (row.prd_id, row.prd_title) {
                    (Some(id), Some(title)) => Some(PrdSummary {
                        id,
                        title,
                        description: row.prd_description.unwrap_or_default(),
                    }),
                    _ => None,
                };
                Ok(SessionSummary {
                    session: row.session.try_into()?,
                    prd,
                })
            })
            .collect()
    }

    pub async fn update_title(&self, id: &str, title: &str) -> StorageResult<()> {
        let result = sqlx::query("UPDATE sessions SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Session {}", id)));
        }
        Ok(())
    }

    pub async fn update_step(&self, id: &str, step: SessionStep) -> StorageResult<()> {
        let result =
            sqlx::query("UPDATE sessions SET current_step = ?, updated_at = ? WHERE id = ?")
                .bind(u8::from(step) as i64)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Session {}", id)));
        }
        Ok(())
    }

    /// Delete a session with its messages and PRD. Returns false when the
    /// session did not exist.
    pub async fn delete(&self, id: &str) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM prds WHERE session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!("Deleted session {}", id);
        }
        Ok(deleted)
    }
}
