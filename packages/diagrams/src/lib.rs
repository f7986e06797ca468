// ABOUTME: Mermaid diagram support for prdsmith
// ABOUTME: Prompt builders, source cleanup, syntax validation and the generate/validate/retry pipeline

pub mod cleanup;
pub mod pipeline;
pub mod prompts;
pub mod validator;

pub use cleanup::clean_mermaid;
pub use pipeline::{
    DiagramBatch, DiagramGenerator, DiagramStatus, GeneratedDiagram, DEFAULT_MAX_ATTEMPTS,
};
pub use validator::{MermaidValidation, MermaidValidator};
