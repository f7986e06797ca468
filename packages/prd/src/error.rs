// ABOUTME: Error types for the PRD workflow
// ABOUTME: Classifies request, model output, provider and storage failures

use prdsmith_ai::AIServiceError;
use prdsmith_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrdError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("PRD for session {0} has not been finalized")]
    NotFinalized(String),

    #[error("AI service error: {0}")]
    Upstream(String),

    #[error("Model returned malformed output: {0}")]
    MalformedResponse(String),

    #[error("Model returned an incomplete PRD, missing: {}", .0.join(", "))]
    IncompleteDocument(Vec<String>),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StorageError> for PrdError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => PrdError::NotFound(what),
            other => PrdError::Storage(other),
        }
    }
}

impl From<AIServiceError> for PrdError {
    fn from(err: AIServiceError) -> Self {
        if err.is_upstream() {
            PrdError::Upstream(err.to_string())
        } else {
            PrdError::MalformedResponse(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, PrdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_errors_are_classified() {
        let upstream: PrdError = AIServiceError::Upstream {
            status: 429,
            body: "rate limited".into(),
        }
        .into();
        assert!(matches!(upstream, PrdError::Upstream(ref msg) if msg.contains("429")));

        let malformed: PrdError = AIServiceError::InvalidResponse("no choices".into()).into();
        assert!(matches!(malformed, PrdError::MalformedResponse(_)));
    }

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: PrdError = StorageError::NotFound("Session abc".into()).into();
        assert_eq!(err.to_string(), "Session abc not found");
    }

    #[test]
    fn test_incomplete_document_lists_fields() {
        let err = PrdError::IncompleteDocument(vec!["title".into(), "features".into()]);
        assert_eq!(
            err.to_string(),
            "Model returned an incomplete PRD, missing: title, features"
        );
    }
}
