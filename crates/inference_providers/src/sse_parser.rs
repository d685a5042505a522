use crate::{CompletionError, ContentChunk};
use bytes::Bytes;
use futures_util::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Represents a single SSE event with both raw bytes and parsed content
#[derive(Debug, Clone, serde::Serialize)]
pub struct SSEEvent {
    /// The raw bytes of this SSE event (including "data: " prefix and newline)
    #[serde(skip)]
    pub raw_bytes: Bytes,
    /// The parsed chunk
    pub chunk: ContentChunk,
}

/// Provider-specific translation of one SSE `data:` payload
pub trait SSEEventParser {
    /// Per-stream state carried between events
    type State: Send;

    /// Parse the payload of a `data:` line.
    ///
    /// Returns `Ok(None)` for payloads that carry nothing worth emitting.
    fn parse_event(
        state: &mut Self::State,
        data: &str,
    ) -> Result<Option<ContentChunk>, CompletionError>;
}

/// SSE (Server-Sent Events) stream parser that buffers incomplete events
/// across HTTP chunks
///
/// Lines are split on raw bytes before decoding, so a multi-byte UTF-8
/// character split across two network reads is decoded intact. A single
/// network read may complete several events; they are queued and returned
/// one per poll.
pub struct BufferedSSEParser<S, P: SSEEventParser> {
    inner: S,
    bytes_buffer: Vec<u8>,
    pending: VecDeque<Result<SSEEvent, CompletionError>>,
    state: P::State,
    finished: bool,
}

impl<S, P> BufferedSSEParser<S, P>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
    P: SSEEventParser,
{
    pub fn new(stream: S, state: P::State) -> Self {
        Self {
            inner: stream,
            bytes_buffer: Vec::new(),
            pending: VecDeque::new(),
            state,
            finished: false,
        }
    }

    fn process_line(&mut self, raw_bytes: Bytes) {
        let line = String::from_utf8_lossy(&raw_bytes).trim().to_string();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with(':') {
            return;
        }

        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();

        // Handle end-of-stream marker
        if data == "[DONE]" {
            return;
        }

        match P::parse_event(&mut self.state, data) {
            Ok(Some(chunk)) => self.pending.push_back(Ok(SSEEvent { raw_bytes, chunk })),
            Ok(None) => {}
            Err(e) => self.pending.push_back(Err(e)),
        }
    }

    fn process_buffer(&mut self) {
        while let Some(newline_pos) = self.bytes_buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.bytes_buffer.drain(..=newline_pos).collect();
            self.process_line(Bytes::from(raw));
        }
    }

    fn flush_remaining(&mut self) {
        if self.bytes_buffer.iter().all(|b| b.is_ascii_whitespace()) {
            self.bytes_buffer.clear();
            return;
        }
        tracing::debug!(
            bytes = self.bytes_buffer.len(),
            "Flushing unterminated SSE line at stream end"
        );
        let raw = std::mem::take(&mut self.bytes_buffer);
        self.process_line(Bytes::from(raw));
    }
}

impl<S, P> Stream for BufferedSSEParser<S, P>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
    P: SSEEventParser,
    P::State: Unpin,
{
    type Item = Result<SSEEvent, CompletionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Poll::Ready(Some(event));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.bytes_buffer.extend_from_slice(&bytes);
                    self.process_buffer();
                }
                Poll::Ready(Some(Err(e))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(CompletionError::CompletionError(
                        e.to_string(),
                    ))));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    self.flush_remaining();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
