use super::citations::CitationCollector;
use super::errors::ReportError;
use super::ports::{ReportSurfaces, TriggerControl};
use super::prompt::ReportPrompt;
use super::render::{render_final, render_in_progress};
use futures::StreamExt;
use inference_providers::{
    Content, FinishReason, GenerateContentParams, InferenceProvider, SourceCitation, TokenUsage,
    ToolSpec,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shown instead of a report when no API key is configured
pub const MISSING_CREDENTIAL_HTML: &str = r#"<p style="color: red; font-weight: bold;">Klucz API nie jest skonfigurowany. Ustaw zmienną środowiskową API_KEY.</p>"#;

/// Shown when the request or the stream fails
pub const GENERATION_FAILED_HTML: &str = r#"<p style="color: red; font-weight: bold;">Wystąpił błąd podczas generowania raportu. Sprawdź logi, aby uzyskać więcej informacji.</p>"#;

/// Static inputs of every generation
#[derive(Debug, Clone)]
pub struct ReportGeneratorConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub search_enabled: bool,
    pub prompt: ReportPrompt,
}

impl ReportGeneratorConfig {
    pub fn from_config(config: &config::ReportConfig) -> Result<Self, ReportError> {
        Ok(Self {
            model: config.gemini.model.clone(),
            api_key: config.gemini.api_key.clone(),
            search_enabled: config.report.search_enabled,
            prompt: ReportPrompt::from_settings(&config.report)?,
        })
    }
}

/// Result of a completed generation
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    /// Concatenated Markdown as streamed
    pub markdown: String,
    /// Final HTML render, without cursor
    pub html: String,
    /// Deduplicated sources in first-occurrence order
    pub citations: Vec<SourceCitation>,
    pub chunk_count: usize,
    /// Why the model stopped, as reported by the last chunk that said so
    pub finish_reason: Option<FinishReason>,
    /// Token counts from the last chunk carrying usage
    pub usage: Option<TokenUsage>,
}

/// Keeps the trigger disabled while alive
///
/// Dropping it re-enables the trigger and releases the in-flight flag, so
/// both happen on success, on error and while unwinding.
struct LoadingGuard<'a> {
    trigger: &'a dyn TriggerControl,
    in_flight: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    fn engage(trigger: &'a dyn TriggerControl, in_flight: &'a AtomicBool) -> Self {
        trigger.set_loading(true);
        Self { trigger, in_flight }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.trigger.set_loading(false);
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Streams a report from the provider into the injected surfaces
pub struct ReportGenerator {
    provider: Arc<dyn InferenceProvider>,
    surfaces: ReportSurfaces,
    config: ReportGeneratorConfig,
    in_flight: AtomicBool,
}

impl ReportGenerator {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        surfaces: ReportSurfaces,
        config: ReportGeneratorConfig,
    ) -> Self {
        Self {
            provider,
            surfaces,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a generation is currently streaming
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Generate one report
    ///
    /// A call made while another generation is still streaming is rejected
    /// with [`ReportError::AlreadyRunning`] and leaves every surface untouched.
    pub async fn generate(&self) -> Result<ReportOutcome, ReportError> {
        let Some(api_key) = self.config.api_key.clone() else {
            self.surfaces.display.set_html(MISSING_CREDENTIAL_HTML);
            return Err(ReportError::MissingCredential);
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Report generation already in progress, ignoring trigger");
            return Err(ReportError::AlreadyRunning);
        }

        let _loading = LoadingGuard::engage(self.surfaces.trigger.as_ref(), &self.in_flight);
        self.surfaces.display.clear();
        self.surfaces.citations.clear();

        match self.stream_report(api_key).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    model = %self.config.model,
                    "Report generation failed"
                );
                self.surfaces.display.set_html(GENERATION_FAILED_HTML);
                Err(e)
            }
        }
    }

    fn build_params(&self, api_key: String) -> GenerateContentParams {
        let tools = if self.config.search_enabled {
            vec![ToolSpec::GoogleSearch]
        } else {
            vec![]
        };

        GenerateContentParams {
            model: self.config.model.clone(),
            api_key,
            system_instruction: Some(self.config.prompt.system_instruction.clone()),
            contents: vec![Content::user(self.config.prompt.user_instruction.clone())],
            tools,
        }
    }

    async fn stream_report(&self, api_key: String) -> Result<ReportOutcome, ReportError> {
        let started = Instant::now();
        tracing::info!(
            model = %self.config.model,
            search = self.config.search_enabled,
            "Starting report generation"
        );

        let mut stream = self
            .provider
            .generate_content_stream(self.build_params(api_key))
            .await?;

        let display = &self.surfaces.display;
        let mut markdown = String::new();
        let mut citations = CitationCollector::new();
        let mut chunk_count = 0usize;
        let mut received_bytes = 0usize;
        let mut finish_reason = None;
        let mut usage = None;

        while let Some(event) = stream.next().await {
            let event = event?;
            received_bytes += event.raw_bytes.len();
            let chunk = event.chunk;
            chunk_count += 1;

            if let Some(text) = &chunk.text {
                markdown.push_str(text);
            }

            display.set_html(&render_in_progress(&markdown));
            display.scroll_to_end();

            if let Some(chunk_citations) = &chunk.citations {
                citations.extend(chunk_citations);
            }
            if chunk.finish_reason.is_some() {
                finish_reason = chunk.finish_reason;
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }

            tracing::debug!(
                chunk = chunk_count,
                chars = markdown.len(),
                sources = citations.len(),
                "Rendered report chunk"
            );
        }

        let html = render_final(&markdown);
        display.set_html(&html);

        let citations = citations.into_citations();
        if !citations.is_empty() {
            self.surfaces.citations.show(&citations);
        }

        if let Some(reason) = finish_reason.filter(|r| *r != FinishReason::Stop) {
            tracing::warn!(
                finish_reason = ?reason,
                chars = markdown.len(),
                "Report stream ended before the model finished"
            );
        }

        tracing::info!(
            chunks = chunk_count,
            chars = markdown.len(),
            bytes = received_bytes,
            sources = citations.len(),
            finish_reason = ?finish_reason,
            prompt_tokens = usage.map(|u| u.prompt_tokens),
            completion_tokens = usage.map(|u| u.completion_tokens),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report generation completed"
        );

        Ok(ReportOutcome {
            markdown,
            html,
            citations,
            chunk_count,
            finish_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ports::{MockCitationSurface, MockDisplaySurface, MockTriggerControl};
    use crate::report::render::{markdown_to_html, CURSOR_HTML};
    use crate::test_utils::{GatedProvider, RecordingSurfaces, SurfaceEvent};
    use inference_providers::mock::ResponseTemplate;
    use inference_providers::{ContentChunk, MockProvider};
    use mockall::Sequence;

    fn config(api_key: Option<&str>) -> ReportGeneratorConfig {
        ReportGeneratorConfig {
            model: "gemini-2.5-flash".to_string(),
            api_key: api_key.map(str::to_string),
            search_enabled: true,
            prompt: ReportPrompt::default(),
        }
    }

    fn cite(uri: &str, title: &str) -> SourceCitation {
        SourceCitation::new(uri, Some(title.to_string()))
    }

    fn worked_example() -> Vec<ContentChunk> {
        vec![
            ContentChunk::text("Hello "),
            ContentChunk::text("world").with_citations(vec![cite("https://a.test", "A")]),
            ContentChunk::text("!").with_citations(vec![cite("https://a.test", "A (dup)")]),
        ]
    }

    fn generator(
        provider: &MockProvider,
        recorder: &RecordingSurfaces,
        key: Option<&str>,
    ) -> ReportGenerator {
        ReportGenerator::new(Arc::new(provider.clone()), recorder.surfaces(), config(key))
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let provider = MockProvider::with_response(ResponseTemplate::new(worked_example()));
        let recorder = RecordingSurfaces::new();
        let generator = generator(&provider, &recorder, None);

        let err = generator.generate().await.unwrap_err();

        assert!(matches!(err, ReportError::MissingCredential));
        assert_eq!(provider.call_count().await, 0);
        assert_eq!(
            recorder.events(),
            vec![SurfaceEvent::Html(MISSING_CREDENTIAL_HTML.to_string())]
        );
    }

    #[tokio::test]
    async fn test_worked_example() {
        let provider = MockProvider::with_response(ResponseTemplate::new(worked_example()));
        let recorder = RecordingSurfaces::new();
        let generator = generator(&provider, &recorder, Some("key"));

        let outcome = generator.generate().await.unwrap();

        assert_eq!(outcome.markdown, "Hello world!");
        assert_eq!(outcome.html, markdown_to_html("Hello world!"));
        assert_eq!(outcome.citations, vec![cite("https://a.test", "A")]);
        assert_eq!(outcome.chunk_count, 3);
        assert_eq!(recorder.last_html(), Some(markdown_to_html("Hello world!")));
        assert_eq!(recorder.shown_citations(), Some(vec![cite("https://a.test", "A")]));
    }

    #[tokio::test]
    async fn test_request_carries_prompt_key_and_search_tool() {
        let provider = MockProvider::with_response(ResponseTemplate::new(worked_example()));
        let recorder = RecordingSurfaces::new();
        generator(&provider, &recorder, Some("secret"))
            .generate()
            .await
            .unwrap();

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.api_key, "secret");
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.tools, vec![ToolSpec::GoogleSearch]);
        assert_eq!(
            request.contents,
            vec![Content::user("Przygotuj raport na dziś.")]
        );
        assert!(request
            .system_instruction
            .as_deref()
            .is_some_and(|s| s.contains("Executive summary")));
    }

    #[tokio::test]
    async fn test_final_render_is_conversion_of_concatenation() {
        let fragments = [
            "## Nagłówek\n",
            "\n- punkt ",
            "pierwszy\n",
            "- punkt drugi",
            "\n\n**koniec**",
        ];
        let chunks = fragments.iter().map(|f| ContentChunk::text(*f)).collect();
        let provider = MockProvider::with_response(ResponseTemplate::new(chunks));
        let recorder = RecordingSurfaces::new();

        let outcome = generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        let expected = markdown_to_html(&fragments.concat());
        assert_eq!(outcome.html, expected);
        assert_eq!(recorder.last_html(), Some(expected));
    }

    #[tokio::test]
    async fn test_cursor_in_every_intermediate_render_only() {
        let provider = MockProvider::with_response(ResponseTemplate::new(worked_example()));
        let recorder = RecordingSurfaces::new();
        generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        let renders = recorder.html_renders();
        // one render per chunk plus the final render
        assert_eq!(renders.len(), 4);
        let (last, intermediate) = renders.split_last().unwrap();
        assert!(intermediate.iter().all(|html| html.ends_with(CURSOR_HTML)));
        assert!(!last.contains(CURSOR_HTML));
        assert_eq!(intermediate[0], format!("{}{CURSOR_HTML}", markdown_to_html("Hello ")));
        assert_eq!(recorder.scroll_count(), 3);
    }

    #[tokio::test]
    async fn test_chunk_without_text_still_renders() {
        let chunks = vec![
            ContentChunk::text("a"),
            ContentChunk::default().with_citations(vec![cite("https://b.test", "B")]),
        ];
        let provider = MockProvider::with_response(ResponseTemplate::new(chunks));
        let recorder = RecordingSurfaces::new();
        let outcome = generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        assert_eq!(recorder.html_renders().len(), 3);
        assert_eq!(outcome.citations, vec![cite("https://b.test", "B")]);
    }

    #[tokio::test]
    async fn test_citation_list_hidden_without_grounding() {
        let provider = MockProvider::with_response(ResponseTemplate::from_text("no sources here"));
        let recorder = RecordingSurfaces::new();
        let outcome = generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        assert!(outcome.citations.is_empty());
        assert_eq!(recorder.shown_citations(), None);
        assert!(recorder.events().contains(&SurfaceEvent::CitationsCleared));
    }

    #[tokio::test]
    async fn test_stream_failure_shows_generic_message_and_reenables_trigger() {
        let provider = MockProvider::with_response(
            ResponseTemplate::new(worked_example()).with_failure_after(2),
        );
        let recorder = RecordingSurfaces::new();
        let generator = generator(&provider, &recorder, Some("key"));

        let err = generator.generate().await.unwrap_err();

        assert!(matches!(err, ReportError::Provider(_)));
        assert_eq!(recorder.last_html(), Some(GENERATION_FAILED_HTML.to_string()));
        assert_eq!(recorder.shown_citations(), None);
        assert_eq!(recorder.loading_states(), vec![true, false]);
        assert!(!generator.is_running());
    }

    #[tokio::test]
    async fn test_request_failure_reenables_trigger() {
        let provider = MockProvider::with_response(
            ResponseTemplate::default().with_request_failure("connection refused"),
        );
        let recorder = RecordingSurfaces::new();
        let generator = generator(&provider, &recorder, Some("key"));

        assert!(generator.generate().await.is_err());
        assert_eq!(recorder.loading_states(), vec![true, false]);
        assert_eq!(recorder.last_html(), Some(GENERATION_FAILED_HTML.to_string()));

        // The generator is usable again after a failure
        provider
            .set_response(ResponseTemplate::from_text("retry works"))
            .await;
        let outcome = generator.generate().await.unwrap();
        assert_eq!(outcome.markdown, "retry works");
    }

    #[tokio::test]
    async fn test_trigger_disabled_for_exactly_the_generation() {
        let provider = MockProvider::with_response(ResponseTemplate::new(worked_example()));
        let recorder = RecordingSurfaces::new();
        generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        let events = recorder.events();
        assert_eq!(events.first(), Some(&SurfaceEvent::Loading(true)));
        assert_eq!(events.last(), Some(&SurfaceEvent::Loading(false)));
        let loading_events = events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Loading(_)))
            .count();
        assert_eq!(loading_events, 2);
    }

    #[tokio::test]
    async fn test_surface_call_order() {
        let mut seq = Sequence::new();
        let mut trigger = MockTriggerControl::new();
        let mut display = MockDisplaySurface::new();
        let mut citations = MockCitationSurface::new();

        trigger
            .expect_set_loading()
            .withf(|loading| *loading)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        display
            .expect_clear()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        citations
            .expect_clear()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        display
            .expect_set_html()
            .withf(|html| html.ends_with(CURSOR_HTML))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        display
            .expect_scroll_to_end()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        display
            .expect_set_html()
            .withf(|html| html == markdown_to_html("only").as_str())
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        citations
            .expect_show()
            .withf(|shown| shown == [cite("https://a.test", "A")])
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        trigger
            .expect_set_loading()
            .withf(|loading| !*loading)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let provider = MockProvider::with_response(ResponseTemplate::new(vec![
            ContentChunk::text("only").with_citations(vec![cite("https://a.test", "A")]),
        ]));
        let generator = ReportGenerator::new(
            Arc::new(provider),
            ReportSurfaces {
                display: Arc::new(display),
                citations: Arc::new(citations),
                trigger: Arc::new(trigger),
            },
            config(Some("key")),
        );

        generator.generate().await.unwrap();
    }

    #[tokio::test]
    async fn test_overlapping_invocation_is_rejected() {
        let (release, gate) = tokio::sync::oneshot::channel();
        let provider = GatedProvider::new(gate, vec![ContentChunk::text("slow report")]);
        let recorder = RecordingSurfaces::new();
        let generator = Arc::new(ReportGenerator::new(
            Arc::new(provider),
            recorder.surfaces(),
            config(Some("key")),
        ));

        let first = tokio::spawn({
            let generator = generator.clone();
            async move { generator.generate().await }
        });
        while !generator.is_running() {
            tokio::task::yield_now().await;
        }

        let events_before = recorder.events();
        let second = generator.generate().await;
        assert!(matches!(second, Err(ReportError::AlreadyRunning)));
        assert_eq!(recorder.events(), events_before);

        release.send(()).unwrap();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.markdown, "slow report");
        assert_eq!(recorder.loading_states(), vec![true, false]);
        assert!(!generator.is_running());

        // The trigger works again once the first generation is done
        assert!(generator.generate().await.is_ok());
        assert_eq!(recorder.loading_states(), vec![true, false, true, false]);
    }

    #[tokio::test]
    async fn test_outcome_reports_truncated_stream() {
        let chunks = vec![
            ContentChunk::text("## Executive summary\n"),
            ContentChunk {
                usage: Some(TokenUsage::new(120, 8192)),
                ..ContentChunk::text("ucięte")
            }
            .with_finish_reason(FinishReason::Length),
        ];
        let provider = MockProvider::with_response(ResponseTemplate::new(chunks));
        let recorder = RecordingSurfaces::new();

        let outcome = generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        assert_eq!(outcome.finish_reason, Some(FinishReason::Length));
        assert_eq!(outcome.usage, Some(TokenUsage::new(120, 8192)));
        assert_eq!(outcome.markdown, "## Executive summary\nucięte");
    }

    #[tokio::test]
    async fn test_outcome_keeps_last_reported_finish_reason() {
        let provider = MockProvider::with_response(ResponseTemplate::from_text("done now"));
        let recorder = RecordingSurfaces::new();

        let outcome = generator(&provider, &recorder, Some("key"))
            .generate()
            .await
            .unwrap();

        assert_eq!(outcome.finish_reason, Some(FinishReason::Stop));
        assert_eq!(outcome.usage, None);
    }

    #[tokio::test]
    async fn test_state_is_reset_between_requests() {
        let provider = MockProvider::with_response(ResponseTemplate::new(worked_example()));
        let recorder = RecordingSurfaces::new();
        let generator = generator(&provider, &recorder, Some("key"));

        generator.generate().await.unwrap();
        provider
            .set_response(ResponseTemplate::from_text("second"))
            .await;
        let outcome = generator.generate().await.unwrap();

        assert_eq!(outcome.markdown, "second");
        assert!(outcome.citations.is_empty());
    }
}
