//! mdcrawl: fetch web pages, optionally follow same-site links, and write each page as Markdown.

pub mod cli;
pub mod config;
pub mod crawl;
pub mod fetch;
pub mod links;
pub mod model;
pub mod output;

// Re-exports for CLI and consumers.
pub use crawl::{crawl, CrawlEvent, CrawlOptions};
pub use fetch::{FetchError, HttpSource, PageSource, PoliteClient, PoliteClientBuilder};
pub use model::{CrawlSummary, Page};
pub use output::{safe_filename, write_page, OutputError};
