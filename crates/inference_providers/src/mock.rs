//! Mock implementation of InferenceProvider for testing
//!
//! This module provides a mock provider that replays scripted chunk sequences
//! without requiring network access, and records every request it receives.

use crate::{
    CompletionError, ContentChunk, FinishReason, GenerateContentParams, InferenceProvider,
    SSEEvent, StreamingResult,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Template for a scripted streaming response
#[derive(Clone, Debug, Default)]
pub struct ResponseTemplate {
    chunks: Vec<ContentChunk>,
    /// Fail the stream after N chunks have been delivered
    fail_after_chunks: Option<usize>,
    /// Fail the request before any stream is returned
    fail_request: Option<String>,
}

impl ResponseTemplate {
    /// Create a template that streams the given chunks in order
    pub fn new(chunks: Vec<ContentChunk>) -> Self {
        Self {
            chunks,
            ..Default::default()
        }
    }

    /// Create a template streaming `content` word by word, ending with a stop reason
    pub fn from_text(content: &str) -> Self {
        let words: Vec<&str> = content.split(' ').collect();
        let last = words.len().saturating_sub(1);
        let chunks = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                let text = if i == 0 {
                    word.to_string()
                } else {
                    format!(" {word}")
                };
                let chunk = ContentChunk::text(text);
                if i == last {
                    chunk.with_finish_reason(FinishReason::Stop)
                } else {
                    chunk
                }
            })
            .collect();
        Self::new(chunks)
    }

    /// Simulate a mid-stream failure after N chunks
    pub fn with_failure_after(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    /// Simulate the request itself failing (e.g. connection refused)
    pub fn with_request_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_request = Some(message.into());
        self
    }

    fn into_events(self) -> Vec<Result<SSEEvent, CompletionError>> {
        let limit = self.fail_after_chunks.unwrap_or(self.chunks.len());
        let mut events: Vec<Result<SSEEvent, CompletionError>> = self
            .chunks
            .into_iter()
            .take(limit)
            .map(|chunk| {
                let payload = serde_json::to_string(&chunk).unwrap_or_default();
                Ok(SSEEvent {
                    raw_bytes: Bytes::from(format!("data: {payload}\n\n")),
                    chunk,
                })
            })
            .collect();

        if self.fail_after_chunks.is_some() {
            events.push(Err(CompletionError::CompletionError(
                "Simulated stream failure".to_string(),
            )));
        }
        events
    }
}

/// Mock provider that implements InferenceProvider for testing
#[derive(Clone)]
pub struct MockProvider {
    response: Arc<Mutex<ResponseTemplate>>,
    requests: Arc<Mutex<Vec<GenerateContentParams>>>,
}

impl MockProvider {
    /// Create a mock provider with a short default response
    pub fn new() -> Self {
        Self::with_response(ResponseTemplate::from_text("1. 2. 3."))
    }

    /// Create a mock provider replaying the given template on every request
    pub fn with_response(response: ResponseTemplate) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the scripted response for subsequent requests
    pub async fn set_response(&self, response: ResponseTemplate) {
        *self.response.lock().await = response;
    }

    /// Number of generation requests received so far
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Requests received so far, oldest first
    pub async fn requests(&self) -> Vec<GenerateContentParams> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    async fn generate_content_stream(
        &self,
        params: GenerateContentParams,
    ) -> Result<StreamingResult, CompletionError> {
        self.requests.lock().await.push(params);

        let template = self.response.lock().await.clone();
        if let Some(message) = &template.fail_request {
            return Err(CompletionError::CompletionError(message.clone()));
        }

        Ok(Box::pin(stream::iter(template.into_events())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Content;
    use futures_util::StreamExt;

    fn params() -> GenerateContentParams {
        GenerateContentParams {
            model: "mock".to_string(),
            api_key: "key".to_string(),
            system_instruction: None,
            contents: vec![Content::user("hi")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_from_text_streams_words() {
        let provider = MockProvider::with_response(ResponseTemplate::from_text("a b c"));
        let stream = provider.generate_content_stream(params()).await.unwrap();
        let chunks: Vec<ContentChunk> = stream.map(|e| e.unwrap().chunk).collect().await;

        let text: String = chunks.iter().filter_map(|c| c.text.as_deref()).collect();
        assert_eq!(text, "a b c");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].finish_reason, Some(FinishReason::Stop));
        assert_eq!(provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_failure_after_chunks() {
        let provider = MockProvider::with_response(
            ResponseTemplate::from_text("a b c").with_failure_after(1),
        );
        let stream = provider.generate_content_stream(params()).await.unwrap();
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(events[1].is_err());
    }

    #[tokio::test]
    async fn test_request_failure() {
        let provider =
            MockProvider::with_response(ResponseTemplate::default().with_request_failure("down"));
        assert!(provider.generate_content_stream(params()).await.is_err());
        assert_eq!(provider.call_count().await, 1);
    }
}
