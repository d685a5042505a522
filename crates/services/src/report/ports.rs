use inference_providers::SourceCitation;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// Surface the rendered report is written into
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
pub trait DisplaySurface: Send + Sync {
    /// Remove any previous content
    fn clear(&self);

    /// Replace the whole surface with the given HTML fragment
    fn set_html(&self, html: &str);

    /// Bring the end of the content into view
    fn scroll_to_end(&self);
}

/// Surface listing the web sources cited by the report
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
pub trait CitationSurface: Send + Sync {
    /// Remove all entries and hide the list
    fn clear(&self);

    /// Replace the entries with `citations` and make the list visible
    fn show(&self, citations: &[SourceCitation]);
}

/// The control that starts a generation
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
pub trait TriggerControl: Send + Sync {
    /// `true` disables the trigger and shows the loading indicator
    fn set_loading(&self, loading: bool);
}

/// The three surfaces a generation writes to
#[derive(Clone)]
pub struct ReportSurfaces {
    pub display: std::sync::Arc<dyn DisplaySurface>,
    pub citations: std::sync::Arc<dyn CitationSurface>,
    pub trigger: std::sync::Arc<dyn TriggerControl>,
}
