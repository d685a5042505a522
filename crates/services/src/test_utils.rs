// Test utilities for services crate
#![cfg(test)]

use crate::report::{CitationSurface, DisplaySurface, ReportSurfaces, TriggerControl};
use async_trait::async_trait;
use futures::StreamExt;
use inference_providers::{
    CompletionError, ContentChunk, GenerateContentParams, InferenceProvider, SSEEvent,
    SourceCitation, StreamingResult,
};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    DisplayCleared,
    Html(String),
    Scrolled,
    CitationsCleared,
    CitationsShown(Vec<SourceCitation>),
    Loading(bool),
}

/// Records every surface call, in order, across all three surfaces
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl Recorder {
    fn push(&self, event: SurfaceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DisplaySurface for Recorder {
    fn clear(&self) {
        self.push(SurfaceEvent::DisplayCleared);
    }

    fn set_html(&self, html: &str) {
        self.push(SurfaceEvent::Html(html.to_string()));
    }

    fn scroll_to_end(&self) {
        self.push(SurfaceEvent::Scrolled);
    }
}

impl CitationSurface for Recorder {
    fn clear(&self) {
        self.push(SurfaceEvent::CitationsCleared);
    }

    fn show(&self, citations: &[SourceCitation]) {
        self.push(SurfaceEvent::CitationsShown(citations.to_vec()));
    }
}

impl TriggerControl for Recorder {
    fn set_loading(&self, loading: bool) {
        self.push(SurfaceEvent::Loading(loading));
    }
}

pub struct RecordingSurfaces {
    recorder: Arc<Recorder>,
}

impl RecordingSurfaces {
    pub fn new() -> Self {
        Self {
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn surfaces(&self) -> ReportSurfaces {
        ReportSurfaces {
            display: self.recorder.clone(),
            citations: self.recorder.clone(),
            trigger: self.recorder.clone(),
        }
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.recorder.events.lock().unwrap().clone()
    }

    pub fn html_renders(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Html(html) => Some(html),
                _ => None,
            })
            .collect()
    }

    pub fn last_html(&self) -> Option<String> {
        self.html_renders().pop()
    }

    pub fn scroll_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SurfaceEvent::Scrolled))
            .count()
    }

    /// Citations from the last `show` call, if the list was ever shown
    pub fn shown_citations(&self) -> Option<Vec<SourceCitation>> {
        self.events().into_iter().rev().find_map(|event| match event {
            SurfaceEvent::CitationsShown(citations) => Some(citations),
            _ => None,
        })
    }

    pub fn loading_states(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Loading(loading) => Some(loading),
                _ => None,
            })
            .collect()
    }
}

/// Provider whose first stream stays silent until the gate is released
pub struct GatedProvider {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    chunks: Vec<ContentChunk>,
}

impl GatedProvider {
    pub fn new(gate: oneshot::Receiver<()>, chunks: Vec<ContentChunk>) -> Self {
        Self {
            gate: Mutex::new(Some(gate)),
            chunks,
        }
    }
}

#[async_trait]
impl InferenceProvider for GatedProvider {
    async fn generate_content_stream(
        &self,
        _params: GenerateContentParams,
    ) -> Result<StreamingResult, CompletionError> {
        let gate = self.gate.lock().unwrap().take();
        let events: Vec<Result<SSEEvent, CompletionError>> = self
            .chunks
            .iter()
            .cloned()
            .map(|chunk| {
                Ok(SSEEvent {
                    raw_bytes: Default::default(),
                    chunk,
                })
            })
            .collect();

        let wait = futures::stream::once(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
        })
        .filter_map(|_| async { None::<Result<SSEEvent, CompletionError>> });
        let stream = wait.chain(futures::stream::iter(events));

        Ok(Box::pin(stream))
    }
}
