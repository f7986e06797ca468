// ABOUTME: LLM integration for prdsmith
// ABOUTME: Chat-completion client trait, HTTP implementation and streaming helpers

pub mod client;
pub mod service;
pub mod settings;
pub mod stream;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{
    AIResponse, AIServiceError, AIServiceResult, ChatMessage, ChatRequest, ChatRole, LlmClient,
    ResponseMode, Usage,
};
pub use service::ChatService;
pub use settings::AiSettings;
pub use stream::{collect_stream, ChatStream, StreamChunk};
