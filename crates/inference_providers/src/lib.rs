//! Inference providers crate for streaming generative text backends
//!
//! This crate provides a streaming-first trait interface over hosted
//! generative AI APIs. A request yields a stream of `ContentChunk`s, each
//! optionally carrying a text fragment and the web sources (grounding
//! citations) the model attached to it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use inference_providers::{Content, GenerateContentParams, InferenceProvider, ToolSpec};
//! use futures_util::StreamExt;
//!
//! async fn example<P: InferenceProvider>(provider: P) {
//!     let params = GenerateContentParams {
//!         model: "gemini-2.5-flash".to_string(),
//!         api_key: std::env::var("API_KEY").unwrap(),
//!         system_instruction: Some("You are a research assistant".to_string()),
//!         contents: vec![Content::user("Summarise today's news")],
//!         tools: vec![ToolSpec::GoogleSearch],
//!     };
//!
//!     let mut stream = provider.generate_content_stream(params).await?;
//!     while let Some(event) = stream.next().await {
//!         match event {
//!             Ok(event) => {
//!                 if let Some(text) = event.chunk.text {
//!                     print!("{text}");
//!                 }
//!             }
//!             Err(e) => eprintln!("Stream error: {}", e),
//!         }
//!     }
//! }
//! ```

pub mod external;
pub mod mock;
pub mod models;
pub mod sse_parser;

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

// Re-export commonly used types for convenience
pub use mock::MockProvider;
pub use models::{
    CompletionError, Content, ContentChunk, ContentRole, FinishReason, GenerateContentParams,
    SourceCitation, TokenUsage, ToolSpec,
};
pub use sse_parser::{BufferedSSEParser, SSEEvent, SSEEventParser};

// External provider exports
pub use external::{ExternalProvider, ExternalProviderConfig, GeminiBackend, ProviderConfig};

/// Type alias for streaming completion results
///
/// This represents a stream of SSE events where each event contains:
/// - `raw_bytes` - The exact bytes received from the source
/// - `chunk` - The parsed ContentChunk for processing
pub type StreamingResult = Pin<Box<dyn Stream<Item = Result<SSEEvent, CompletionError>> + Send>>;

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Performs a streaming content generation request
    ///
    /// Returns a stream of chunks that can be processed incrementally to
    /// provide real-time output. The stream emits chunks as they become
    /// available from the underlying provider and ends when the response
    /// is complete.
    async fn generate_content_stream(
        &self,
        params: GenerateContentParams,
    ) -> Result<StreamingResult, CompletionError>;
}
