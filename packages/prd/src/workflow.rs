// ABOUTME: Session-scoped PRD workflow from idea to final document
// ABOUTME: Orchestrates model calls, diagram generation, persistence, history and analytics

use std::sync::Arc;
use std::time::Instant;

use prdsmith_ai::{ChatRequest, LlmClient};
use prdsmith_core::{
    truncate_chars, DiagramKind, DiagramSet, MessageRole, PrdDocument, PrdRecord, Session,
    SessionDetail, SessionStep, SessionSummary, MIN_IDEA_CHARS, SESSION_TITLE_MAX_CHARS,
};
use prdsmith_diagrams::{DiagramBatch, DiagramGenerator, GeneratedDiagram};
use prdsmith_storage::{
    AnalyticsStorage, EventType, MessageStorage, NewEvent, PrdStorage, SessionStorage,
};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::error::{PrdError, Result};
use crate::merge::{merge_document, PrdPatch, TargetField};
use crate::parse::{decode_json_object, parse_prd_document};
use crate::prompts::{
    edit_prompt, finalize_prompt, generate_prompt, EDIT_SYSTEM_PROMPT, FINALIZE_SYSTEM_PROMPT,
    GENERATE_SYSTEM_PROMPT,
};

/// Analytics id used when the caller does not send one
pub const ANONYMOUS_ID: &str = "anonymous";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPrd {
    pub session_id: String,
    pub prd_id: String,
    pub prd: PrdDocument,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedPrd {
    pub prd: PrdDocument,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalizedPrd {
    pub markdown: String,
    pub message: String,
}

/// Stored diagram sources keyed by kind, empty string when absent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagramCodes {
    pub architecture: String,
    pub journey: String,
    pub features: String,
    pub dataflow: String,
}

impl From<&DiagramSet> for DiagramCodes {
    fn from(set: &DiagramSet) -> Self {
        let code = |kind| set.get(kind).unwrap_or_default().to_string();
        Self {
            architecture: code(DiagramKind::Architecture),
            journey: code(DiagramKind::Journey),
            features: code(DiagramKind::Features),
            dataflow: code(DiagramKind::Dataflow),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramsGenerated {
    pub diagrams: DiagramCodes,
    pub validation: Vec<GeneratedDiagram>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdited {
    pub diagram_type: DiagramKind,
    pub code: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

/// Final Markdown plus the title export file names derive from
#[derive(Debug, Clone)]
pub struct FinalDocument {
    pub title: String,
    pub markdown: String,
}

pub struct PrdWorkflow {
    client: Arc<dyn LlmClient>,
    diagrams: DiagramGenerator,
    sessions: SessionStorage,
    messages: MessageStorage,
    prds: PrdStorage,
    analytics: AnalyticsStorage,
}

impl PrdWorkflow {
    pub fn new(client: Arc<dyn LlmClient>, pool: SqlitePool) -> Self {
        Self {
            diagrams: DiagramGenerator::new(client.clone()),
            client,
            sessions: SessionStorage::new(pool.clone()),
            messages: MessageStorage::new(pool.clone()),
            prds: PrdStorage::new(pool.clone()),
            analytics: AnalyticsStorage::new(pool),
        }
    }

    /// Override how many model calls each diagram kind may use
    pub fn with_diagram_attempts(mut self, max_attempts: u32) -> Self {
        self.diagrams = DiagramGenerator::new(self.client.clone()).with_max_attempts(max_attempts);
        self
    }

    pub fn analytics(&self) -> &AnalyticsStorage {
        &self.analytics
    }

    // ------------------------------------------------------------------
    // PRD draft
    // ------------------------------------------------------------------

    /// Start a session from an idea and draft its PRD
    pub async fn generate(&self, idea: &str, anonymous_id: Option<&str>) -> Result<GeneratedPrd> {
        let idea = idea.trim();
        if idea.chars().count() < MIN_IDEA_CHARS {
            return Err(PrdError::Validation(format!(
                "idea must be at least {} characters",
                MIN_IDEA_CHARS
            )));
        }
        let anonymous_id = anonymous_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(ANONYMOUS_ID);

        let started = Instant::now();
        let session = self
            .sessions
            .create(&truncate_chars(idea, SESSION_TITLE_MAX_CHARS))
            .await?;
        self.messages
            .append(&session.id, MessageRole::User, idea)
            .await?;

        info!("Generating PRD for session {}", session.id);
        let outcome = self.draft(idea).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        let (doc, tokens) = match outcome {
            Ok(drafted) => drafted,
            Err(e) => {
                error!("PRD generation failed for session {}: {}", session.id, e);
                let event = NewEvent::new(EventType::PrdFailed, anonymous_id)
                    .with_session(&session.id)
                    .with_duration_ms(duration_ms)
                    .with_metadata(json!({ "error": e.to_string() }));
                self.record_generation(&event, 0).await;
                return Err(e);
            }
        };

        let record = self.prds.create(&session.id, &doc).await?;
        self.messages
            .append(
                &session.id,
                MessageRole::Assistant,
                &format!("Generated PRD: {}\n\n{}", doc.title, doc.description),
            )
            .await?;
        self.sessions.update_title(&session.id, &doc.title).await?;

        let event = NewEvent::new(EventType::PrdGenerated, anonymous_id)
            .with_session(&session.id)
            .with_duration_ms(duration_ms)
            .with_metadata(json!({ "title": doc.title, "tokensUsed": tokens }));
        self.record_generation(&event, tokens).await;

        info!(
            "Generated PRD '{}' for session {} ({} features, {} tokens)",
            doc.title,
            session.id,
            doc.features.len(),
            tokens
        );

        Ok(GeneratedPrd {
            session_id: session.id,
            prd_id: record.id,
            prd: doc,
        })
    }

    async fn draft(&self, idea: &str) -> Result<(PrdDocument, u32)> {
        let request = ChatRequest::json(GENERATE_SYSTEM_PROMPT, generate_prompt(idea));
        let response = self.client.chat(request).await?;
        let doc = parse_prd_document(&response.data)?;
        Ok((doc, response.usage.total_tokens()))
    }

    async fn record_generation(&self, event: &NewEvent, tokens: u32) {
        if let Err(e) = self.analytics.record_generation(event, tokens).await {
            warn!("Failed to record generation analytics: {}", e);
        }
    }

    /// Apply a natural-language edit to a session's PRD
    pub async fn edit(
        &self,
        session_id: &str,
        instruction: &str,
        target_field: Option<&str>,
    ) -> Result<EditedPrd> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PrdError::Validation("instruction must not be empty".into()));
        }
        let target = target_field
            .filter(|field| !field.trim().is_empty())
            .map(str::parse::<TargetField>)
            .transpose()?;

        let session = self.require_session(session_id).await?;
        let record = self.require_prd(session_id).await?;

        info!(
            "Editing PRD {} (target: {})",
            record.id,
            target.map_or("any", |t| t.as_str())
        );
        let prompt = edit_prompt(&record.document, instruction, target)?;
        let response = self
            .client
            .chat(ChatRequest::json(EDIT_SYSTEM_PROMPT, prompt))
            .await?;

        let patch = PrdPatch::from_object(decode_json_object(&response.data)?)?;
        if let Some(target) = target {
            let extra: Vec<TargetField> = patch
                .touched()
                .into_iter()
                .filter(|field| *field != target)
                .collect();
            if !extra.is_empty() {
                debug!("Edit aimed at {} also returned {:?}", target, extra);
            }
        }
        let merged = merge_document(&record.document, patch)?;

        self.prds.update_document(&record.id, &merged).await?;
        if merged.title != session.title {
            self.sessions.update_title(session_id, &merged.title).await?;
        }

        self.messages
            .append(session_id, MessageRole::User, instruction)
            .await?;
        self.messages
            .append(
                session_id,
                MessageRole::Assistant,
                &format!("Updated the PRD: {}", instruction),
            )
            .await?;

        Ok(EditedPrd {
            prd: merged,
            message: "PRD updated".to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Diagrams
    // ------------------------------------------------------------------

    /// Generate every diagram kind, or regenerate just one
    pub async fn generate_diagrams(
        &self,
        session_id: &str,
        kind: Option<DiagramKind>,
    ) -> Result<DiagramsGenerated> {
        self.require_session(session_id).await?;
        let record = self.require_prd(session_id).await?;

        let batch = match kind {
            Some(kind) => {
                info!("Regenerating {} diagram for PRD {}", kind, record.id);
                let diagram = self
                    .diagrams
                    .generate(kind, &record.document, record.diagrams.get(kind))
                    .await?;
                DiagramBatch {
                    diagrams: vec![diagram],
                }
            }
            None => {
                info!("Generating all diagrams for PRD {}", record.id);
                self.diagrams
                    .generate_all(&record.document, &record.diagrams)
                    .await?
            }
        };

        let updated = self.prds.update_diagrams(&record.id, &batch.to_set()).await?;
        self.sessions
            .update_step(session_id, SessionStep::Diagrams)
            .await?;

        let generated: Vec<&str> = batch.diagrams.iter().map(|d| d.kind.as_str()).collect();
        self.messages
            .append(
                session_id,
                MessageRole::Assistant,
                &format!("Generated diagrams: {}", generated.join(", ")),
            )
            .await?;

        let message = match kind {
            Some(kind) => format!("Regenerated the {}", kind.display_name()),
            None => format!(
                "Generated {} diagrams ({} valid)",
                batch.diagrams.len(),
                batch.valid_count()
            ),
        };

        Ok(DiagramsGenerated {
            diagrams: DiagramCodes::from(&updated.diagrams),
            validation: batch.diagrams,
            message,
        })
    }

    /// Rewrite one stored diagram from an instruction
    pub async fn edit_diagram(
        &self,
        session_id: &str,
        kind: DiagramKind,
        instruction: &str,
    ) -> Result<DiagramEdited> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PrdError::Validation("instruction must not be empty".into()));
        }

        self.require_session(session_id).await?;
        let record = self.require_prd(session_id).await?;
        let current = record
            .diagrams
            .get(kind)
            .filter(|code| !code.trim().is_empty())
            .ok_or_else(|| {
                PrdError::NotFound(format!("{} for session {}", kind.display_name(), session_id))
            })?;

        info!("Editing {} diagram for PRD {}", kind, record.id);
        let diagram = self.diagrams.edit(kind, current, instruction).await?;

        let mut update = DiagramSet::default();
        update.set(kind, Some(diagram.code.clone()));
        self.prds.update_diagrams(&record.id, &update).await?;

        self.messages
            .append(
                session_id,
                MessageRole::User,
                &format!("Edit {}: {}", kind.display_name(), instruction),
            )
            .await?;
        self.messages
            .append(
                session_id,
                MessageRole::Assistant,
                &format!("Updated the {}", kind.display_name()),
            )
            .await?;

        Ok(DiagramEdited {
            diagram_type: kind,
            valid: diagram.is_valid(),
            code: diagram.code,
            error: diagram.error,
            message: format!("{} updated", kind.display_name()),
        })
    }

    // ------------------------------------------------------------------
    // Final document
    // ------------------------------------------------------------------

    /// Merge PRD content and diagrams into the final Markdown document
    pub async fn finalize(&self, session_id: &str) -> Result<FinalizedPrd> {
        self.require_session(session_id).await?;
        let record = self.require_prd(session_id).await?;

        let diagram_count = record.diagrams.present_count();
        info!(
            "Finalizing PRD {} with {} diagram(s)",
            record.id, diagram_count
        );

        let prompt = finalize_prompt(&record.document, &record.diagrams);
        let response = self
            .client
            .chat(ChatRequest::text(FINALIZE_SYSTEM_PROMPT, prompt))
            .await?;
        let markdown = response.data;

        self.prds.finalize(&record.id, &markdown).await?;
        self.sessions
            .update_step(session_id, SessionStep::Final)
            .await?;
        self.messages
            .append(
                session_id,
                MessageRole::Assistant,
                &format!(
                    "Generated the final PRD with {} diagram(s) included",
                    diagram_count
                ),
            )
            .await?;

        Ok(FinalizedPrd {
            markdown,
            message: "Final PRD generated".to_string(),
        })
    }

    /// Stored final document; never calls the model
    pub async fn get_final(&self, session_id: &str) -> Result<FinalDocument> {
        self.require_session(session_id).await?;
        let record = self.require_prd(session_id).await?;
        match (record.is_final, record.final_content) {
            (true, Some(markdown)) => Ok(FinalDocument {
                title: record.document.title,
                markdown,
            }),
            _ => Err(PrdError::NotFinalized(session_id.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.sessions.list().await?)
    }

    pub async fn get_session_detail(&self, session_id: &str) -> Result<SessionDetail> {
        let session = self.require_session(session_id).await?;
        let messages = self.messages.list_for_session(session_id).await?;
        let prd = self.prds.get_by_session(session_id).await?;
        Ok(SessionDetail {
            session,
            messages,
            prd,
        })
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        if !self.sessions.delete(session_id).await? {
            return Err(PrdError::NotFound(format!("Session {}", session_id)));
        }
        info!("Deleted session {}", session_id);
        Ok(())
    }

    pub async fn track_page_view(
        &self,
        anonymous_id: &str,
        session_id: Option<&str>,
        path: Option<&str>,
    ) -> Result<()> {
        if anonymous_id.trim().is_empty() {
            return Err(PrdError::Validation("anonymousId must not be empty".into()));
        }
        self.analytics
            .record_page_view(anonymous_id, session_id, path)
            .await?;
        Ok(())
    }

    async fn require_session(&self, session_id: &str) -> Result<Session> {
        if session_id.trim().is_empty() {
            return Err(PrdError::Validation("sessionId must not be empty".into()));
        }
        Ok(self.sessions.require(session_id).await?)
    }

    async fn require_prd(&self, session_id: &str) -> Result<PrdRecord> {
        self.prds
            .get_by_session(session_id)
            .await?
            .ok_or_else(|| PrdError::NotFound(format!("PRD for session {}", session_id)))
    }
}
