// ABOUTME: PRD storage operations
// ABOUTME: Persists structured PRD fields as JSON text and decodes them with safe fallbacks

use chrono::{DateTime, Utc};
use prdsmith_core::{
    generate_id, safe_json_parse, DiagramSet, PrdDocument, PrdRecord, TargetUsers,
    TechFeasibility,
};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::{StorageError, StorageResult};

#[derive(Debug, FromRow)]
struct PrdRow {
    id: String,
    session_id: String,
    title: String,
    description: String,
    background: Option<String>,
    target_users: Option<String>,
    pain_points: Option<String>,
    core_value: Option<String>,
    features: Option<String>,
    success_metrics: Option<String>,
    tech_feasibility: Option<String>,
    competitors: Option<String>,
    mermaid_architecture: Option<String>,
    mermaid_journey: Option<String>,
    mermaid_features: Option<String>,
    mermaid_dataflow: Option<String>,
    is_final: bool,
    final_content: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PrdRow> for PrdRecord {
    /// Stored JSON never fails a read; malformed text decodes to defaults
    fn from(row: PrdRow) -> Self {
        let document = PrdDocument {
            title: row.title,
            description: row.description,
            background: row.background,
            target_users: safe_json_parse(row.target_users.as_deref(), TargetUsers::default()),
            pain_points: safe_json_parse(row.pain_points.as_deref(), Vec::new()),
            core_value: safe_json_parse(row.core_value.as_deref(), Vec::new()),
            features: safe_json_parse(row.features.as_deref(), Vec::new()),
            success_metrics: safe_json_parse(row.success_metrics.as_deref(), Vec::new()),
            tech_feasibility: safe_json_parse::<Option<TechFeasibility>>(
                row.tech_feasibility.as_deref(),
                None,
            ),
            competitors: safe_json_parse(row.competitors.as_deref(), Vec::new()),
        };

        PrdRecord {
            id: row.id,
            session_id: row.session_id,
            document,
            diagrams: DiagramSet {
                architecture: row.mermaid_architecture,
                journey: row.mermaid_journey,
                features: row.mermaid_features,
                dataflow: row.mermaid_dataflow,
            },
            is_final: row.is_final,
            final_content: row.final_content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// JSON text for every list/object column of a document
struct EncodedDocument {
    target_users: String,
    pain_points: String,
    core_value: String,
    features: String,
    success_metrics: String,
    tech_feasibility: Option<String>,
    competitors: String,
}

impl EncodedDocument {
    fn encode(doc: &PrdDocument) -> StorageResult<Self> {
        Ok(Self {
            target_users: serde_json::to_string(&doc.target_users)?,
            pain_points: serde_json::to_string(&doc.pain_points)?,
            core_value: serde_json::to_string(&doc.core_value)?,
            features: serde_json::to_string(&doc.features)?,
            success_metrics: serde_json::to_string(&doc.success_metrics)?,
            tech_feasibility: doc
                .tech_feasibility
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            competitors: serde_json::to_string(&doc.competitors)?,
        })
    }
}

pub struct PrdStorage {
    pool: SqlitePool,
}

impl PrdStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session_id: &str, doc: &PrdDocument) -> StorageResult<PrdRecord> {
        let encoded = EncodedDocument::encode(doc)?;
        let id = generate_id();
        let now = Utc::now();

        let row = sqlx::query_as::<_, PrdRow>(
            r#"
            INSERT INTO prds (
                id, session_id, title, description, background, target_users, pain_points,
                core_value, features, success_metrics, tech_feasibility, competitors,
                is_final, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(session_id)
        .bind(&doc.title)
        .bind(&doc.description)
        .bind(&doc.background)
        .bind(&encoded.target_users)
        .bind(&encoded.pain_points)
        .bind(&encoded.core_value)
        .bind(&encoded.features)
        .bind(&encoded.success_metrics)
        .bind(&encoded.tech_feasibility)
        .bind(&encoded.competitors)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!("Created PRD {} for session {}", id, session_id);
        Ok(row.into())
    }

    pub async fn get_by_session(&self, session_id: &str) -> StorageResult<Option<PrdRecord>> {
        Ok(
            sqlx::query_as::<_, PrdRow>("SELECT * FROM prds WHERE session_id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?
                .map(PrdRecord::from),
        )
    }

    /// Overwrite the document fields. Diagrams and final content are untouched.
    pub async fn update_document(&self, id: &str, doc: &PrdDocument) -> StorageResult<PrdRecord> {
        let encoded = EncodedDocument::encode(doc)?;

        let row = sqlx::query_as::<_, PrdRow>(
            r#"
            UPDATE prds
            SET title = ?, description = ?, background = ?, target_users = ?, pain_points = ?,
                core_value = ?, features = ?, success_metrics = ?, tech_feasibility = ?,
                competitors = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&doc.title)
        .bind(&doc.description)
        .bind(&doc.background)
        .bind(&encoded.target_users)
        .bind(&encoded.pain_points)
        .bind(&encoded.core_value)
        .bind(&encoded.features)
        .bind(&encoded.success_metrics)
        .bind(&encoded.tech_feasibility)
        .bind(&encoded.competitors)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("PRD {}", id)))?;

        Ok(row.into())
    }

    /// Write the diagram slots that are `Some`; `None` slots keep their value
    pub async fn update_diagrams(&self, id: &str, diagrams: &DiagramSet) -> StorageResult<PrdRecord> {
        let row = sqlx::query_as::<_, PrdRow>(
            r#"
            UPDATE prds
            SET mermaid_architecture = COALESCE(?, mermaid_architecture),
                mermaid_journey = COALESCE(?, mermaid_journey),
                mermaid_features = COALESCE(?, mermaid_features),
                mermaid_dataflow = COALESCE(?, mermaid_dataflow),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&diagrams.architecture)
        .bind(&diagrams.journey)
        .bind(&diagrams.features)
        .bind(&diagrams.dataflow)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("PRD {}", id)))?;

        Ok(row.into())
    }

    /// Store the final Markdown and mark the PRD final in one statement
    pub async fn finalize(&self, id: &str, final_content: &str) -> StorageResult<PrdRecord> {
        let row = sqlx::query_as::<_, PrdRow>(
            r#"
            UPDATE prds
            SET final_content = ?, is_final = 1, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(final_content)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("PRD {}", id)))?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::sessions::SessionStorage;
    use pretty_assertions::assert_eq;
    use prdsmith_core::{Competitor, Difficulty, Feature, Priority};

    fn sample_document() -> PrdDocument {
        PrdDocument {
            title: "Minutes".into(),
            description: "Meeting summaries".into(),
            background: Some("Too many meetings".into()),
            target_users: TargetUsers {
                primary: vec!["Managers".into()],
                secondary: vec!["Assistants".into()],
            },
            pain_points: vec!["Notes get lost".into()],
            core_value: vec!["Save time".into()],
            features: vec![Feature {
                id: "f1".into(),
                name: "Transcribe".into(),
                description: "Speech to text".into(),
                priority: Priority::High,
                effort: 4,
                value: 5,
                acceptance_criteria: vec!["Supports mp3".into()],
            }],
            success_metrics: vec!["DAU".into()],
            tech_feasibility: Some(TechFeasibility {
                overall: Difficulty::Medium,
                challenges: vec!["Accents".into()],
                recommendations: vec!["Use Whisper".into()],
            }),
            competitors: vec![Competitor {
                name: "Otter".into(),
                features: vec!["Live notes".into()],
                differences: "Cheaper".into(),
            }],
        }
    }

    async fn setup() -> (PrdStorage, SqlitePool, String) {
        let pool = connect_in_memory().await.unwrap();
        let session = SessionStorage::new(pool.clone())
            .create("idea")
            .await
            .unwrap();
        (PrdStorage::new(pool.clone()), pool, session.id)
    }

    #[tokio::test]
    async fn test_document_round_trips_through_json_columns() {
        let (storage, _pool, session_id) = setup().await;
        let doc = sample_document();

        let created = storage.create(&session_id, &doc).await.unwrap();
        let fetched = storage.get_by_session(&session_id).await.unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.document, doc);
        assert!(!fetched.is_final);
        assert_eq!(fetched.diagrams, DiagramSet::default());
    }

    #[tokio::test]
    async fn test_corrupted_json_decodes_to_defaults() {
        let (storage, pool, session_id) = setup().await;
        let created = storage.create(&session_id, &sample_document()).await.unwrap();

        sqlx::query(
            "UPDATE prds SET features = '{broken', target_users = 'null', tech_feasibility = '[1' WHERE id = ?",
        )
        .bind(&created.id)
        .execute(&pool)
        .await
        .unwrap();

        let fetched = storage.get_by_session(&session_id).await.unwrap().unwrap();
        assert!(fetched.document.features.is_empty());
        assert_eq!(fetched.document.target_users, TargetUsers::default());
        assert!(fetched.document.tech_feasibility.is_none());
        assert_eq!(fetched.document.pain_points, vec!["Notes get lost".to_string()]);
    }

    #[tokio::test]
    async fn test_update_diagrams_only_touches_present_slots() {
        let (storage, _pool, session_id) = setup().await;
        let created = storage.create(&session_id, &sample_document()).await.unwrap();

        let mut all = DiagramSet::default();
        all.architecture = Some("graph TD\n A-->B".into());
        all.journey = Some("journey".into());
        storage.update_diagrams(&created.id, &all).await.unwrap();

        let mut one = DiagramSet::default();
        one.journey = Some("journey\n title New".into());
        let updated = storage.update_diagrams(&created.id, &one).await.unwrap();

        assert_eq!(updated.diagrams.architecture.as_deref(), Some("graph TD\n A-->B"));
        assert_eq!(updated.diagrams.journey.as_deref(), Some("journey\n title New"));
        assert!(updated.diagrams.features.is_none());
    }

    #[tokio::test]
    async fn test_finalize_sets_flag_and_content_together() {
        let (storage, _pool, session_id) = setup().await;
        let created = storage.create(&session_id, &sample_document()).await.unwrap();

        let finalized = storage.finalize(&created.id, "# Minutes").await.unwrap();
        assert!(finalized.is_final);
        assert_eq!(finalized.final_content.as_deref(), Some("# Minutes"));

        // Document edits leave the final content in place
        let mut doc = sample_document();
        doc.title = "Minutes Pro".into();
        let edited = storage.update_document(&created.id, &doc).await.unwrap();
        assert!(edited.is_final);
        assert_eq!(edited.document.title, "Minutes Pro");
    }

    #[tokio::test]
    async fn test_one_prd_per_session() {
        let (storage, _pool, session_id) = setup().await;
        storage.create(&session_id, &sample_document()).await.unwrap();
        assert!(storage.create(&session_id, &sample_document()).await.is_err());
    }

    #[tokio::test]
    async fn test_updates_on_missing_prd_are_not_found() {
        let (storage, _pool, _session_id) = setup().await;
        assert!(matches!(
            storage.finalize("missing", "x").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
