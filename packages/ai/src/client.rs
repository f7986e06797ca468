// ABOUTME: LLM client contract shared by the pipelines and their fakes
// ABOUTME: Request/response types, error taxonomy and the LlmClient trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stream::ChatStream;

#[derive(Debug, Error)]
pub enum AIServiceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("No API key configured (set LLM_API_KEY)")]
    NoApiKey,

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl AIServiceError {
    /// True for failures of the provider call itself (transport, status,
    /// configuration) as opposed to a reply we could not make sense of.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AIServiceError::RequestFailed(_)
                | AIServiceError::Upstream { .. }
                | AIServiceError::ApiError(_)
                | AIServiceError::NoApiKey
        )
    }
}

pub type AIServiceResult<T> = Result<T, AIServiceError>;

/// Output constraint requested from the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    #[default]
    Text,
    /// Server is instructed to emit a single JSON object
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One chat call: system prompt, prior turns, then the user prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub history: Vec<ChatMessage>,
    pub mode: ResponseMode,
}

impl ChatRequest {
    pub fn text(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            history: Vec::new(),
            mode: ResponseMode::Text,
        }
    }

    pub fn json(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            mode: ResponseMode::Json,
            ..Self::text(system_prompt, user_prompt)
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Full message list in wire order
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: self.system_prompt.clone(),
        });
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.user_prompt.clone()));
        messages
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug)]
pub struct AIResponse<T> {
    pub data: T,
    pub usage: Usage,
}

/// Chat-completion backend. No retries happen at this layer.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the text of the first completion choice
    async fn chat(&self, request: ChatRequest) -> AIServiceResult<AIResponse<String>>;

    /// Incremental variant; the stream ends after `StreamChunk::Done`
    async fn chat_stream(&self, request: ChatRequest) -> AIServiceResult<ChatStream>;
}
