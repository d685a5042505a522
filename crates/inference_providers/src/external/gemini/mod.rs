//! Streaming client for the Gemini `streamGenerateContent` endpoint
//!
//! Requests are sent with `alt=sse` and the response body is decoded by
//! [`GeminiEventParser`]. JSON shapes live in `converter`.

mod converter;

use super::backend::{BackendConfig, ExternalBackend};
use crate::{BufferedSSEParser, CompletionError, GenerateContentParams, StreamingResult};
use async_trait::async_trait;
use bytes::Bytes;
use converter::{build_request, GeminiEventParser, GeminiParserState};
use futures_util::Stream;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;

pub use converter::{GeminiRequest, GeminiResponse};

/// HTTP side of the Gemini provider
pub struct GeminiBackend {
    client: Client,
}

impl GeminiBackend {
    pub fn new() -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| {
                CompletionError::CompletionError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }
}

/// Headers for one request; the key travels in `x-goog-api-key`, never in the URL
fn request_headers(api_key: &str) -> Result<HeaderMap, CompletionError> {
    let mut key = HeaderValue::from_str(api_key)
        .map_err(|e| CompletionError::CompletionError(format!("Invalid API key: {e}")))?;
    key.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("x-goog-api-key", key);
    Ok(headers)
}

/// `google/gemini-2.5-flash` and `vertex/gemini-2.5-flash` both address `gemini-2.5-flash`
fn strip_vendor_prefix(model: &str) -> &str {
    ["google/", "vertex/"]
        .iter()
        .find_map(|prefix| model.strip_prefix(prefix))
        .unwrap_or(model)
}

pub type GeminiSSEParser<S> = BufferedSSEParser<S, GeminiEventParser>;

/// Wrap a response body in a Gemini event decoder
pub fn new_gemini_sse_parser<S>(stream: S, model: String) -> GeminiSSEParser<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    BufferedSSEParser::new(stream, GeminiParserState::new(model))
}

#[async_trait]
impl ExternalBackend for GeminiBackend {
    fn backend_type(&self) -> &'static str {
        "gemini"
    }

    async fn generate_content_stream(
        &self,
        config: &BackendConfig,
        params: GenerateContentParams,
    ) -> Result<StreamingResult, CompletionError> {
        let model_name = strip_vendor_prefix(&params.model);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            config.base_url.trim_end_matches('/'),
            model_name
        );

        let request = build_request(&params);
        let headers = request_headers(&params.api_key)?;

        tracing::debug!(
            model = %model_name,
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending Gemini streaming request"
        );

        let mut builder = self.client.post(&url).headers(headers).json(&request);
        if let Some(timeout_seconds) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(timeout_seconds));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CompletionError::CompletionError(e.to_string()))?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response body: {e}"));
            return Err(CompletionError::HttpError {
                status_code,
                message: error_text,
            });
        }

        let sse_stream = new_gemini_sse_parser(response.bytes_stream(), model_name.to_string());
        Ok(Box::pin(sse_stream))
    }
}
