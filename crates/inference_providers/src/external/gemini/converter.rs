//! Gemini format converter
//!
//! Converts between our provider-neutral types and Google Gemini's native
//! `generateContent` format. This module handles:
//! - Request conversion (params → Gemini request body)
//! - Streaming event parsing (Gemini response → `ContentChunk`)
//! - Grounding metadata extraction (search results → `SourceCitation`)

use crate::{
    CompletionError, Content, ContentChunk, ContentRole, FinishReason, GenerateContentParams,
    SSEEventParser, SourceCitation, TokenUsage, ToolSpec,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Gemini Request Types
// =============================================================================

/// Gemini part format
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on parts carrying the model's internal reasoning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl GeminiPart {
    pub fn text(s: String) -> Self {
        Self {
            text: Some(s),
            thought: None,
        }
    }
}

/// Gemini content format
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Gemini system instruction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiSystemInstruction {
    pub parts: Vec<GeminiPart>,
}

/// Empty marker object enabling Google Search grounding
#[derive(Debug, Clone, Serialize)]
pub struct GeminiGoogleSearch {}

/// Gemini tool entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<GeminiGoogleSearch>,
}

/// Gemini request format
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
}

// =============================================================================
// Gemini Response Types
// =============================================================================

/// Web page backing a grounded claim
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiWebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiGroundingChunk {
    pub web: Option<GeminiWebSource>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GeminiGroundingChunk>,
}

/// Gemini response candidate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<GeminiGroundingMetadata>,
}

/// Gemini usage metadata
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: i32,
    #[serde(default)]
    pub candidates_token_count: i32,
    #[serde(default)]
    pub total_token_count: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    pub block_reason: Option<String>,
}

/// Error object Gemini may send in place of a response
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

/// Gemini response format (one per SSE event when streaming)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<GeminiUsageMetadata>,
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    pub error: Option<GeminiError>,
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn convert_role(role: ContentRole) -> &'static str {
    match role {
        ContentRole::User => "user",
        ContentRole::Model => "model",
    }
}

/// Convert conversation turns to Gemini format
pub fn convert_contents(contents: &[Content]) -> Vec<GeminiContent> {
    contents
        .iter()
        .map(|content| GeminiContent {
            role: Some(convert_role(content.role).to_string()),
            parts: vec![GeminiPart::text(content.text.clone())],
        })
        .collect()
}

/// Convert tool specs to Gemini format
pub fn convert_tools(tools: &[ToolSpec]) -> Vec<GeminiTool> {
    tools
        .iter()
        .map(|tool| match tool {
            ToolSpec::GoogleSearch => GeminiTool {
                google_search: Some(GeminiGoogleSearch {}),
            },
        })
        .collect()
}

/// Build the request body for `streamGenerateContent`
pub fn build_request(params: &GenerateContentParams) -> GeminiRequest {
    let system_instruction = params
        .system_instruction
        .as_ref()
        .filter(|s| !s.is_empty())
        .map(|s| GeminiSystemInstruction {
            parts: vec![GeminiPart::text(s.clone())],
        });

    let tools = Some(convert_tools(&params.tools)).filter(|t| !t.is_empty());

    GeminiRequest {
        contents: convert_contents(&params.contents),
        system_instruction,
        tools,
    }
}

/// Map Gemini's finishReason to our finish reason
///
/// Gemini uses: "STOP", "MAX_TOKENS", "SAFETY", "RECITATION", "OTHER", ...
pub fn map_finish_reason(finish_reason: Option<&String>) -> Option<FinishReason> {
    finish_reason.map(|r| match r.as_str() {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Other,
    })
}

/// Concatenate the visible text of a candidate, skipping thought parts
pub fn extract_text(parts: &[GeminiPart]) -> Option<String> {
    let text: String = parts
        .iter()
        .filter(|p| !p.thought.unwrap_or(false))
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract web citations from grounding metadata
///
/// Returns `None` when the candidate carries no grounding chunks. Chunks
/// without a web URI are dropped.
pub fn extract_citations(
    metadata: Option<&GeminiGroundingMetadata>,
) -> Option<Vec<SourceCitation>> {
    let metadata = metadata.filter(|m| !m.grounding_chunks.is_empty())?;

    let citations = metadata
        .grounding_chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            web.uri
                .as_ref()
                .filter(|uri| !uri.is_empty())
                .map(|uri| SourceCitation::new(uri.clone(), web.title.clone()))
        })
        .collect();

    Some(citations)
}

// =============================================================================
// Streaming Parser
// =============================================================================

/// Parser state for Gemini streaming
pub struct GeminiParserState {
    pub model: String,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
}

impl GeminiParserState {
    pub fn new(model: String) -> Self {
        Self {
            model,
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }
}

/// Gemini event parser
pub struct GeminiEventParser;

impl SSEEventParser for GeminiEventParser {
    type State = GeminiParserState;

    fn parse_event(
        state: &mut Self::State,
        data: &str,
    ) -> Result<Option<ContentChunk>, CompletionError> {
        let response: GeminiResponse = serde_json::from_str(data).map_err(|e| {
            CompletionError::InvalidResponse(format!("Failed to parse Gemini event: {e}"))
        })?;

        if let Some(error) = response.error {
            let message = match error.status {
                Some(status) => format!("{status}: {}", error.message),
                None => error.message,
            };
            return Err(CompletionError::Upstream {
                code: error.code,
                message,
            });
        }

        if let Some(usage) = &response.usage_metadata {
            state.prompt_tokens = usage.prompt_token_count;
            state.completion_tokens = usage.candidates_token_count;
        }

        let Some(candidate) = response.candidates.first() else {
            if let Some(reason) = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
            {
                return Err(CompletionError::CompletionError(format!(
                    "Prompt blocked by {} ({reason})",
                    state.model
                )));
            }
            return Ok(None);
        };

        let text = candidate
            .content
            .as_ref()
            .and_then(|content| extract_text(&content.parts));

        Ok(Some(ContentChunk {
            text,
            citations: extract_citations(candidate.grounding_metadata.as_ref()),
            finish_reason: map_finish_reason(candidate.finish_reason.as_ref()),
            usage: response
                .usage_metadata
                .as_ref()
                .map(|_| TokenUsage::new(state.prompt_tokens, state.completion_tokens)),
        }))
    }
}
