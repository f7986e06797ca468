// ABOUTME: Chat-completion client for OpenAI-compatible LLM endpoints
// ABOUTME: Handles request building, status mapping, JSON mode and SSE streaming

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::client::{
    AIResponse, AIServiceError, AIServiceResult, ChatMessage, ChatRequest, LlmClient,
    ResponseMode, Usage,
};
use crate::settings::AiSettings;
use crate::stream::{sse_stream, ChatStream};

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// LLM client speaking the `/chat/completions` protocol
pub struct ChatService {
    client: Client,
    settings: AiSettings,
}

impl ChatService {
    pub fn new(settings: AiSettings) -> AIServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_seconds))
            .build()?;

        if settings.api_key.is_none() {
            info!("LLM_API_KEY not set - generation requests will fail until configured");
        }

        Ok(Self { client, settings })
    }

    /// Get the model being used by this service
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: request.messages(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            response_format: match request.mode {
                ResponseMode::Json => Some(ResponseFormat {
                    format_type: "json_object",
                }),
                ResponseMode::Text => None,
            },
            stream: stream.then_some(true),
        }
    }

    async fn send(&self, body: &CompletionRequest) -> AIServiceResult<Response> {
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .ok_or(AIServiceError::NoApiKey)?;

        info!(
            "Making LLM request: model={}, messages={}, stream={}",
            body.model,
            body.messages.len(),
            body.stream.unwrap_or(false)
        );

        let response = self
            .client
            .post(self.settings.completions_url())
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!(
                        "LLM request timed out after {} seconds",
                        self.settings.timeout_seconds
                    );
                    AIServiceError::ApiError(format!(
                        "Request timed out after {} seconds",
                        self.settings.timeout_seconds
                    ))
                } else {
                    error!("LLM request failed: {}", e);
                    AIServiceError::RequestFailed(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("LLM API error: {} - {}", status, body);
            return Err(AIServiceError::Upstream { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmClient for ChatService {
    async fn chat(&self, request: ChatRequest) -> AIServiceResult<AIResponse<String>> {
        let body = self.build_request(&request, false);
        let response = self.send(&body).await?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AIServiceError::ParseError(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AIServiceError::InvalidResponse("no completion choices".to_string()))?;

        debug!(
            "LLM response received: chars={}, tokens={}",
            text.chars().count(),
            completion.usage.total_tokens()
        );

        Ok(AIResponse {
            data: text,
            usage: completion.usage,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> AIServiceResult<ChatStream> {
        let body = self.build_request(&request, true);
        let response = self.send(&body).await?;

        Ok(sse_stream(response.bytes_stream()))
    }
}
