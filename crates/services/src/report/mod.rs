//! Streaming daily report generation
//!
//! [`ReportGenerator`] sends one grounded generation request, renders the
//! growing Markdown into a [`DisplaySurface`] after every chunk and lists
//! the deduplicated web sources once the stream ends.

pub mod citations;
pub mod errors;
pub mod ports;
pub mod prompt;
pub mod render;
pub mod service;

pub use citations::CitationCollector;
pub use errors::ReportError;
pub use ports::{CitationSurface, DisplaySurface, ReportSurfaces, TriggerControl};
pub use prompt::{ReportPrompt, DEFAULT_SYSTEM_PROMPT};
pub use render::{markdown_to_html, render_final, render_in_progress, CURSOR_HTML};
pub use service::{
    ReportGenerator, ReportGeneratorConfig, ReportOutcome, GENERATION_FAILED_HTML,
    MISSING_CREDENTIAL_HTML,
};
