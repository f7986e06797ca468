// ABOUTME: Scripted LLM client for tests of the generation pipelines
// ABOUTME: Replays queued replies or a responder closure and records every request

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::client::{AIResponse, AIServiceError, AIServiceResult, ChatRequest, LlmClient, Usage};
use crate::stream::{ChatStream, StreamChunk};

type Responder = Box<dyn Fn(&ChatRequest) -> AIServiceResult<String> + Send + Sync>;

/// Fake `LlmClient`. Queued replies are consumed first; once the queue is
/// empty the responder (if any) answers, otherwise the call fails.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<AIServiceResult<String>>>,
    responder: Option<Responder>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> AIServiceResult<String> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: AIServiceError) {
        self.lock_replies().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock_requests().clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<AIServiceResult<String>>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<ChatRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_reply(&self, request: &ChatRequest) -> AIServiceResult<String> {
        self.lock_requests().push(request.clone());

        if let Some(reply) = self.lock_replies().pop_front() {
            return reply;
        }
        match &self.responder {
            Some(responder) => responder(request),
            None => Err(AIServiceError::ApiError(
                "scripted client has no reply queued".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, request: ChatRequest) -> AIServiceResult<AIResponse<String>> {
        let data = self.next_reply(&request)?;
        let usage = Usage {
            prompt_tokens: request.user_prompt.chars().count() as u32,
            completion_tokens: data.chars().count() as u32,
        };
        Ok(AIResponse { data, usage })
    }

    async fn chat_stream(&self, request: ChatRequest) -> AIServiceResult<ChatStream> {
        let text = self.next_reply(&request)?;
        let chars: Vec<char> = text.chars().collect();
        let mut items: Vec<AIServiceResult<StreamChunk>> = chars
            .chunks(16)
            .map(|piece| Ok(StreamChunk::Delta(piece.iter().collect())))
            .collect();
        items.push(Ok(StreamChunk::Done));
        Ok(Box::pin(stream::iter(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::collect_stream;

    #[tokio::test]
    async fn test_queue_then_responder() {
        let client = ScriptedClient::with_responder(|_| Ok("fallback".to_string()));
        client.push_reply("first");

        let first = client.chat(ChatRequest::text("s", "a")).await.unwrap();
        let second = client.chat(ChatRequest::text("s", "b")).await.unwrap();

        assert_eq!(first.data, "first");
        assert_eq!(second.data, "fallback");
        assert_eq!(client.call_count(), 2);
        assert_eq!(client.requests()[1].user_prompt, "b");
    }

    #[tokio::test]
    async fn test_stream_round_trips_text() {
        let client = ScriptedClient::with_replies(["a fairly long reply that spans chunks"]);
        let stream = client.chat_stream(ChatRequest::text("s", "u")).await.unwrap();
        assert_eq!(
            collect_stream(stream).await.unwrap(),
            "a fairly long reply that spans chunks"
        );
    }
}
