//! Hosted generation APIs behind [`InferenceProvider`]
//!
//! [`ExternalProvider`] picks an [`ExternalBackend`] from a [`ProviderConfig`]
//! and forwards every request to it together with the connection settings.
//! Gemini is the only backend; another API format would add a backend module
//! and a `ProviderConfig` variant.

pub mod backend;
pub mod gemini;

use crate::{CompletionError, GenerateContentParams, InferenceProvider, StreamingResult};
use async_trait::async_trait;
use backend::{BackendConfig, ExternalBackend};
use serde::Deserialize;
use std::sync::Arc;

pub use backend::BackendConfig as ExternalBackendConfig;
pub use gemini::GeminiBackend;

/// Which hosted API to talk to
///
/// Tagged by `backend`, e.g. `{"backend": "gemini", "base_url": "..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend")]
pub enum ProviderConfig {
    #[serde(rename = "gemini")]
    Gemini {
        /// API root, up to and including the version segment
        base_url: String,
    },
}

#[derive(Debug, Clone)]
pub struct ExternalProviderConfig {
    pub provider_config: ProviderConfig,
    /// Total request timeout in seconds
    pub timeout_seconds: Option<u64>,
}

/// An [`InferenceProvider`] backed by a hosted API
pub struct ExternalProvider {
    backend: Arc<dyn ExternalBackend>,
    config: BackendConfig,
}

impl ExternalProvider {
    pub fn new(external_config: ExternalProviderConfig) -> Result<Self, CompletionError> {
        let ExternalProviderConfig {
            provider_config,
            timeout_seconds,
        } = external_config;

        let (backend, config): (Arc<dyn ExternalBackend>, BackendConfig) = match provider_config {
            ProviderConfig::Gemini { base_url } => (
                Arc::new(GeminiBackend::new()?),
                BackendConfig {
                    base_url,
                    timeout_seconds,
                },
            ),
        };

        Ok(Self { backend, config })
    }

    /// Short name of the selected backend, for logs
    pub fn backend_type(&self) -> &'static str {
        self.backend.backend_type()
    }
}

#[async_trait]
impl InferenceProvider for ExternalProvider {
    async fn generate_content_stream(
        &self,
        params: GenerateContentParams,
    ) -> Result<StreamingResult, CompletionError> {
        self.backend
            .generate_content_stream(&self.config, params)
            .await
    }
}
