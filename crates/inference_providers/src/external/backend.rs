//! Backend trait for external provider implementations
//!
//! This module defines the internal abstraction for different external AI providers.
//! Each backend handles the API-specific translation between our internal format
//! and the provider's native format.

use crate::{CompletionError, GenerateContentParams, StreamingResult};
use async_trait::async_trait;

/// Configuration for a backend connection
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL for the provider API
    pub base_url: String,
    /// Total request timeout in seconds; `None` lets a stream run to completion
    pub timeout_seconds: Option<u64>,
}

/// Internal backend trait for different API formats
#[async_trait]
pub trait ExternalBackend: Send + Sync {
    /// Returns the backend type identifier (e.g., "gemini")
    fn backend_type(&self) -> &'static str;

    /// Performs a streaming content generation request
    ///
    /// The backend is responsible for:
    /// - Translating GenerateContentParams to provider-specific format
    /// - Making the HTTP request
    /// - Parsing the SSE response and translating it back to our ContentChunk format
    async fn generate_content_stream(
        &self,
        config: &BackendConfig,
        params: GenerateContentParams,
    ) -> Result<StreamingResult, CompletionError>;
}
