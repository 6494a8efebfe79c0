//! Error type for fetching and converting a single page.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Not an HTML page ({content_type}): {url}")]
    NotHtml { url: String, content_type: String },
}

impl FetchError {
    /// Build the matching variant from a reqwest send error.
    pub(crate) fn from_send(url: &str, source: reqwest::Error) -> Self {
        if source.is_builder() {
            FetchError::InvalidUrl {
                input: url.to_string(),
                reason: source.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source,
            }
        }
    }
}
