//! Self-refreshing HTML page backing the report surfaces
//!
//! Every surface call updates the in-memory page state and rewrites the file,
//! so a browser pointed at it follows the report as it streams.
//!
//! Writes block: each surface call does a `std::fs::write` plus `rename` on the
//! calling task's worker thread. The page is expected on local disk; the
//! binary runs on the multi-threaded runtime.

use inference_providers::SourceCitation;
use services::report::{CitationSurface, DisplaySurface, ReportSurfaces, TriggerControl};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct PageState {
    body_html: String,
    citations: Vec<SourceCitation>,
    citations_visible: bool,
    loading: bool,
    scroll_to_end: bool,
}

pub struct ReportPage {
    path: PathBuf,
    refresh_seconds: u32,
    state: Mutex<PageState>,
}

impl ReportPage {
    pub fn new(path: impl Into<PathBuf>, refresh_seconds: u32) -> Self {
        Self {
            path: path.into(),
            refresh_seconds,
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wrap the page as the display, citation list and trigger of a generator
    pub fn surfaces(self: &Arc<Self>) -> ReportSurfaces {
        ReportSurfaces {
            display: self.clone(),
            citations: self.clone(),
            trigger: self.clone(),
        }
    }

    /// The full HTML document for the current state
    pub fn render(&self) -> String {
        render_document(&self.lock(), self.refresh_seconds)
    }

    /// Write the current state to disk
    pub fn write(&self) -> std::io::Result<()> {
        write_page(&self.path, &self.render())
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, apply: impl FnOnce(&mut PageState)) {
        let document = {
            let mut state = self.lock();
            apply(&mut state);
            render_document(&state, self.refresh_seconds)
        };

        if let Err(e) = write_page(&self.path, &document) {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to write report page"
            );
        }
    }
}

impl DisplaySurface for ReportPage {
    fn clear(&self) {
        self.update(|state| {
            state.body_html.clear();
            state.scroll_to_end = false;
        });
    }

    fn set_html(&self, html: &str) {
        self.update(|state| state.body_html = html.to_string());
    }

    fn scroll_to_end(&self) {
        self.update(|state| state.scroll_to_end = true);
    }
}

impl CitationSurface for ReportPage {
    fn clear(&self) {
        self.update(|state| {
            state.citations.clear();
            state.citations_visible = false;
        });
    }

    fn show(&self, citations: &[SourceCitation]) {
        self.update(|state| {
            state.citations = citations.to_vec();
            state.citations_visible = !citations.is_empty();
        });
    }
}

impl TriggerControl for ReportPage {
    fn set_loading(&self, loading: bool) {
        self.update(|state| state.loading = loading);
    }
}

/// Replace the file in one rename so a refreshing browser never reads half a page
fn write_page(path: &Path, document: &str) -> std::io::Result<()> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    std::fs::write(&staging, document)?;
    std::fs::rename(&staging, path)
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_sources(citations: &[SourceCitation]) -> String {
    citations
        .iter()
        .map(|citation| {
            let uri = html_escape(&citation.uri);
            format!(
                "            <li><a href=\"{uri}\" target=\"_blank\" rel=\"noopener noreferrer\" data-url=\"{uri}\">{}</a></li>\n",
                html_escape(citation.display_title())
            )
        })
        .collect()
}

fn render_document(state: &PageState, refresh_seconds: u32) -> String {
    let refresh = if state.loading {
        format!("    <meta http-equiv=\"refresh\" content=\"{refresh_seconds}\">\n")
    } else {
        String::new()
    };
    let disabled = if state.loading { " disabled" } else { "" };
    let loader_class = if state.loading { "loader" } else { "loader hidden" };
    let sources_class = if state.citations_visible { "" } else { "hidden" };
    let scroll = if state.loading && state.scroll_to_end {
        "    <script>\n        const container = document.getElementById('response-container');\n        container.scrollTop = container.scrollHeight;\n    </script>\n"
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
{refresh}    <title>Raport dzienny</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            max-width: 860px;
            margin: 0 auto;
            padding: 24px;
            color: #1f2933;
        }}

        #response-container {{
            max-height: 70vh;
            overflow-y: auto;
            line-height: 1.6;
        }}

        .hidden {{
            display: none;
        }}

        .loader {{
            width: 24px;
            height: 24px;
            border: 3px solid #d0d7de;
            border-top-color: #0b5cad;
            border-radius: 50%;
            animation: spin 1s linear infinite;
        }}

        .cursor {{
            display: inline-block;
            width: 8px;
            height: 1em;
            background: #1f2933;
            vertical-align: text-bottom;
            animation: blink 1s step-end infinite;
        }}

        @keyframes spin {{
            to {{ transform: rotate(360deg); }}
        }}

        @keyframes blink {{
            50% {{ opacity: 0; }}
        }}
    </style>
</head>
<body>
    <h1>Raport dzienny</h1>
    <button id="generate-button"{disabled}>Generuj raport</button>
    <div id="loader" class="{loader_class}"></div>
    <div id="response-container">{body}</div>
    <div id="sources-container" class="{sources_class}">
        <h2>Źródła</h2>
        <ul id="sources-list">
{sources}        </ul>
    </div>
{scroll}</body>
</html>
"#,
        body = state.body_html,
        sources = render_sources(&state.citations),
    )
}
