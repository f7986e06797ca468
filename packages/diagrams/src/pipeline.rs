// ABOUTME: Diagram generation pipeline with bounded validate-and-retry
// ABOUTME: Tracks per-kind state from Pending through Generated to a terminal status

use std::sync::Arc;

use prdsmith_ai::{AIServiceResult, ChatRequest, LlmClient};
use prdsmith_core::{DiagramKind, DiagramSet, PrdDocument};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cleanup::clean_mermaid;
use crate::prompts::{
    diagram_edit_prompt, diagram_prompt, DIAGRAM_EDIT_SYSTEM_PROMPT, DIAGRAM_SYSTEM_PROMPT,
};
use crate::validator::MermaidValidator;

/// One initial attempt plus one retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramStatus {
    Pending,
    /// Model returned text that has not been validated yet
    Generated,
    Valid,
    /// Last attempt still failed validation; code is kept as-is
    Invalid,
    /// Provider answered with something unusable; code is the prior value
    Failed,
}

impl DiagramStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DiagramStatus::Valid | DiagramStatus::Invalid | DiagramStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDiagram {
    pub kind: DiagramKind,
    pub code: String,
    pub status: DiagramStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub tokens: u32,
}

impl GeneratedDiagram {
    fn pending(kind: DiagramKind) -> Self {
        Self {
            kind,
            code: String::new(),
            status: DiagramStatus::Pending,
            attempts: 0,
            error: None,
            tokens: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == DiagramStatus::Valid
    }
}

/// Results of a multi-kind run, in generation order
#[derive(Debug, Clone, Default)]
pub struct DiagramBatch {
    pub diagrams: Vec<GeneratedDiagram>,
}

impl DiagramBatch {
    pub fn get(&self, kind: DiagramKind) -> Option<&GeneratedDiagram> {
        self.diagrams.iter().find(|d| d.kind == kind)
    }

    /// Sources to persist, one slot per generated kind
    pub fn to_set(&self) -> DiagramSet {
        let mut set = DiagramSet::default();
        for diagram in &self.diagrams {
            set.set(diagram.kind, Some(diagram.code.clone()));
        }
        set
    }

    pub fn valid_count(&self) -> usize {
        self.diagrams.iter().filter(|d| d.is_valid()).count()
    }

    pub fn total_tokens(&self) -> u32 {
        self.diagrams.iter().map(|d| d.tokens).sum()
    }
}

/// Generates Mermaid diagrams from a PRD snapshot
pub struct DiagramGenerator {
    client: Arc<dyn LlmClient>,
    validator: MermaidValidator,
    max_attempts: u32,
}

impl DiagramGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            validator: MermaidValidator::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate one kind. Only upstream failures are returned as errors;
    /// every other outcome yields a diagram carrying a terminal status.
    pub async fn generate(
        &self,
        kind: DiagramKind,
        prd: &PrdDocument,
        previous: Option<&str>,
    ) -> AIServiceResult<GeneratedDiagram> {
        let prompt = diagram_prompt(kind, prd);
        let mut diagram = GeneratedDiagram::pending(kind);

        for attempt in 1..=self.max_attempts {
            diagram.attempts = attempt;

            let request = ChatRequest::text(DIAGRAM_SYSTEM_PROMPT, prompt.clone());
            let response = match self.client.chat(request).await {
                Ok(response) => response,
                Err(e) if e.is_upstream() => {
                    error!("Diagram generation for {} aborted: {}", kind, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Unusable response for {} diagram: {}", kind, e);
                    if diagram.status == DiagramStatus::Generated {
                        // An earlier attempt produced text; keep it
                        diagram.status = DiagramStatus::Invalid;
                    } else {
                        diagram.status = DiagramStatus::Failed;
                        diagram.code = previous.unwrap_or_default().to_string();
                        diagram.error = Some(e.to_string());
                    }
                    return Ok(diagram);
                }
            };

            diagram.tokens += response.usage.total_tokens();
            diagram.code = clean_mermaid(&response.data, kind);
            diagram.status = DiagramStatus::Generated;

            let validation = self.validator.validate(&diagram.code);
            if validation.valid {
                info!("{} diagram valid after {} attempt(s)", kind, attempt);
                diagram.status = DiagramStatus::Valid;
                diagram.error = None;
                return Ok(diagram);
            }

            diagram.error = validation.error;
            if attempt < self.max_attempts {
                warn!(
                    "{} diagram failed validation (attempt {}/{}): {}",
                    kind,
                    attempt,
                    self.max_attempts,
                    diagram.error.as_deref().unwrap_or_default()
                );
            }
        }

        warn!(
            "{} diagram still invalid after {} attempts; keeping last output",
            kind, self.max_attempts
        );
        diagram.status = DiagramStatus::Invalid;
        Ok(diagram)
    }

    /// Generate every kind sequentially. An upstream error aborts the run.
    pub async fn generate_all(
        &self,
        prd: &PrdDocument,
        existing: &DiagramSet,
    ) -> AIServiceResult<DiagramBatch> {
        let mut batch = DiagramBatch::default();
        for kind in DiagramKind::ALL {
            let diagram = self.generate(kind, prd, existing.get(kind)).await?;
            batch.diagrams.push(diagram);
        }

        info!(
            "Generated {} diagrams ({} valid, {} tokens)",
            batch.diagrams.len(),
            batch.valid_count(),
            batch.total_tokens()
        );
        Ok(batch)
    }

    /// Rewrite an existing diagram. One call, no retry; the validation
    /// result is attached rather than enforced.
    pub async fn edit(
        &self,
        kind: DiagramKind,
        current_code: &str,
        instruction: &str,
    ) -> AIServiceResult<GeneratedDiagram> {
        let request = ChatRequest::text(
            DIAGRAM_EDIT_SYSTEM_PROMPT,
            diagram_edit_prompt(kind, current_code, instruction),
        );
        let response = self.client.chat(request).await?;

        let mut diagram = GeneratedDiagram::pending(kind);
        diagram.attempts = 1;
        diagram.tokens = response.usage.total_tokens();
        diagram.code = clean_mermaid(&response.data, kind);
        diagram.status = DiagramStatus::Generated;

        let validation = self.validator.validate(&diagram.code);
        diagram.status = if validation.valid {
            DiagramStatus::Valid
        } else {
            warn!("Edited {} diagram failed validation", kind);
            DiagramStatus::Invalid
        };
        diagram.error = validation.error;
        Ok(diagram)
    }
}
