// ABOUTME: Core types and utilities for prdsmith
// ABOUTME: Foundational package shared by the pipeline, storage and API packages

pub mod constants;
pub mod types;
pub mod utils;

// Re-export main types
pub use types::{
    Competitor, DiagramKind, DiagramSet, Difficulty, Feature, Message, MessageRole, ParseEnumError,
    PrdDocument, PrdRecord, PrdSummary, Priority, Session, SessionDetail, SessionStep,
    SessionSummary, TargetUsers, TechFeasibility,
};

// Re-export constants
pub use constants::{data_dir, database_file, MIN_IDEA_CHARS, SESSION_TITLE_MAX_CHARS};

// Re-export utilities
pub use utils::{generate_id, safe_json_parse, truncate_chars};
