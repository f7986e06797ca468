// ABOUTME: Streaming chat support: chunk type, SSE line decoding and buffering
// ABOUTME: Streams are single-pass and end with a Done sentinel

use std::pin::Pin;

use futures::stream::{Stream, StreamExt};
use serde_json::Value;

use crate::client::{AIServiceError, AIServiceResult};

/// One item of a streamed completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Delta(String),
    /// Provider sent its completion sentinel; nothing follows
    Done,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = AIServiceResult<StreamChunk>> + Send>>;

/// Outcome of decoding one SSE line
#[derive(Debug, PartialEq)]
pub(crate) enum SseLine {
    Chunk(StreamChunk),
    Error(String),
    Skip,
}

/// Decode a single `data:` line of an OpenAI-style event stream
pub(crate) fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Chunk(StreamChunk::Done);
    }

    let Ok(event) = serde_json::from_str::<Value>(data) else {
        return SseLine::Skip;
    };

    if let Some(message) = event["error"]["message"].as_str() {
        return SseLine::Error(message.to_string());
    }

    match event["choices"][0]["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => SseLine::Chunk(StreamChunk::Delta(text.to_string())),
        _ => SseLine::Skip,
    }
}

/// Turn a raw SSE byte stream into chat chunks.
///
/// Bytes are buffered until a full line arrives, so a UTF-8 sequence split
/// across network chunks is decoded intact.
pub(crate) fn sse_stream<S, B, E>(bytes: S) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<AIServiceError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk_result) = bytes.next().await {
            match chunk_result {
                Ok(chunk) => {
                    buffer.extend_from_slice(chunk.as_ref());

                    while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                        let line = String::from_utf8_lossy(&raw[..line_end]);

                        match parse_sse_line(line.trim_end_matches('\r')) {
                            SseLine::Chunk(StreamChunk::Done) => {
                                yield Ok(StreamChunk::Done);
                                return;
                            }
                            SseLine::Chunk(chunk) => yield Ok(chunk),
                            SseLine::Error(message) => {
                                yield Err(AIServiceError::ApiError(message));
                                return;
                            }
                            SseLine::Skip => {}
                        }
                    }
                }
                Err(e) => {
                    let error: AIServiceError = e.into();
                    yield Err(error);
                    return;
                }
            }
        }

        // Trailing line without a newline terminator
        if let SseLine::Chunk(chunk) = parse_sse_line(String::from_utf8_lossy(&buffer).trim()) {
            yield Ok(chunk);
        }
    };

    Box::pin(stream)
}

/// Buffer a stream until its sentinel and return the concatenated text
pub async fn collect_stream(mut stream: ChatStream) -> AIServiceResult<String> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Delta(delta) => text.push_str(&delta),
            StreamChunk::Done => return Ok(text),
        }
    }
    Err(AIServiceError::InvalidResponse(
        "stream closed before completion sentinel".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_parse_sse_line_variants() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            SseLine::Chunk(StreamChunk::Delta("Hi".into()))
        );
        assert_eq!(
            parse_sse_line("data: [DONE]"),
            SseLine::Chunk(StreamChunk::Done)
        );
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"quota"}}"#),
            SseLine::Error("quota".into())
        );
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
    }

    #[tokio::test]
    async fn test_sse_stream_keeps_characters_split_across_chunks() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"会议纪要\"}}]}\r\n\ndata: [DONE]\n";
        let bytes = body.as_bytes();
        // Cut inside the three-byte encoding of the first character
        let split = body.find('会').unwrap() + 2;
        let chunks: Vec<Result<Vec<u8>, AIServiceError>> = vec![
            Ok(bytes[..split].to_vec()),
            Ok(bytes[split..split + 1].to_vec()),
            Ok(bytes[split + 1..].to_vec()),
        ];

        let text = collect_stream(sse_stream(stream::iter(chunks))).await.unwrap();
        assert_eq!(text, "会议纪要");
    }

    #[tokio::test]
    async fn test_sse_stream_surfaces_provider_error() {
        let chunks: Vec<Result<&'static [u8], AIServiceError>> =
            vec![Ok(&b"data: {\"error\":{\"message\":\"quota\"}}\n"[..])];
        let result = collect_stream(sse_stream(stream::iter(chunks))).await;
        assert!(matches!(result, Err(AIServiceError::ApiError(m)) if m == "quota"));
    }

    #[tokio::test]
    async fn test_collect_stream_requires_sentinel() {
        let complete: ChatStream = Box::pin(stream::iter(vec![
            Ok(StreamChunk::Delta("a".into())),
            Ok(StreamChunk::Delta("b".into())),
            Ok(StreamChunk::Done),
        ]));
        assert_eq!(collect_stream(complete).await.unwrap(), "ab");

        let truncated: ChatStream =
            Box::pin(stream::iter(vec![Ok(StreamChunk::Delta("a".into()))]));
        assert!(matches!(
            collect_stream(truncated).await,
            Err(AIServiceError::InvalidResponse(_))
        ));
    }
}
