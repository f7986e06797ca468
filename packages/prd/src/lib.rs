// ABOUTME: PRD generation, editing and finalization for prdsmith
// ABOUTME: Prompts, tolerant decoding, merge-on-edit and the session workflow

pub mod error;
pub mod merge;
pub mod parse;
pub mod prompts;
pub mod workflow;

pub use error::{PrdError, Result};
pub use merge::{merge_document, PrdPatch, TargetField};
pub use parse::{decode_json_object, parse_prd_document};
pub use workflow::{
    DiagramCodes, DiagramEdited, DiagramsGenerated, EditedPrd, FinalDocument, FinalizedPrd,
    GeneratedPrd, PrdWorkflow, ANONYMOUS_ID,
};

/// Attempts per diagram when no override is configured
pub use prdsmith_diagrams::DEFAULT_MAX_ATTEMPTS as DEFAULT_DIAGRAM_ATTEMPTS;
