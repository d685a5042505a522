//! Deduplicated, ordered collection of the web sources cited during a stream

use indexmap::IndexMap;
use inference_providers::SourceCitation;

/// Collects citations across every chunk of one response
///
/// Entries are keyed by URI. The first occurrence of a URI fixes both its
/// position and its title; later duplicates are ignored.
#[derive(Debug, Default, Clone)]
pub struct CitationCollector {
    entries: IndexMap<String, Option<String>>,
}

impl CitationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, citations: &[SourceCitation]) {
        for citation in citations {
            if citation.uri.is_empty() {
                continue;
            }
            self.entries
                .entry(citation.uri.clone())
                .or_insert_with(|| citation.title.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_citations(self) -> Vec<SourceCitation> {
        self.entries
            .into_iter()
            .map(|(uri, title)| SourceCitation::new(uri, title))
            .collect()
    }
}
