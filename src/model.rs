//! Shared data types: a converted page and the summary of a crawl run.

use serde::Serialize;

/// One fetched page after conversion.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// URL the page was served from, after redirects.
    pub url: String,
    /// Absolute `<base href>`, when the document declares one. Links resolve against it.
    pub base_url: Option<String>,
    pub title: Option<String>,
    /// Converted content, trimmed.
    pub markdown: String,
    /// Raw link targets in document order. Not yet resolved or filtered.
    pub links: Vec<String>,
}

/// Counters for a finished crawl. Serialized for `--json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub saved: usize,
    #[serde(rename = "skippedExisting")]
    pub skipped_existing: usize,
    #[serde(rename = "skippedThin")]
    pub skipped_thin: usize,
    pub failed: usize,
    /// Distinct URLs taken off the queue.
    pub visited: usize,
}

impl Page {
    /// URL that relative links on this page are resolved against.
    pub fn link_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.url)
    }
}

impl CrawlSummary {
    /// True when at least one page failed and nothing at all was produced or already present.
    pub fn nothing_saved(&self) -> bool {
        self.failed > 0 && self.saved == 0 && self.skipped_existing == 0
    }
}
