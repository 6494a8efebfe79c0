//! Page fetching. The crawl loop only sees [PageSource]; [HttpSource] is the
//! network-backed implementation over the shared [PoliteClient].

mod client;
mod error;
pub mod html;

pub use client::{PoliteClient, PoliteClientBuilder};
pub use error::FetchError;

use crate::links::normalize_url;
use crate::model::Page;
use reqwest::header::CONTENT_TYPE;

/// Upper bound on iframes inlined per page.
const MAX_IFRAMES: usize = 5;

/// Anything that can turn a URL into a converted [Page].
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> Result<Page, FetchError>;
}

/// How a response body is treated, from its Content-Type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    PlainText,
}

/// Missing Content-Type is assumed to be HTML.
fn classify_content_type(content_type: &str) -> Option<BodyKind> {
    let ct = content_type.trim().to_ascii_lowercase();
    if ct.is_empty() || ct.contains("html") {
        Some(BodyKind::Html)
    } else if ct.starts_with("text/plain") || ct.starts_with("text/markdown") {
        Some(BodyKind::PlainText)
    } else {
        None
    }
}

/// A successful response: where it was finally served from, and its body.
struct Fetched {
    final_url: String,
    kind: BodyKind,
    body: String,
}

/// [PageSource] over HTTP. Holds a reference to the shared polite client.
pub struct HttpSource<'a> {
    client: &'a mut PoliteClient,
    process_iframes: bool,
}

impl<'a> HttpSource<'a> {
    pub fn new(client: &'a mut PoliteClient, process_iframes: bool) -> Self {
        Self {
            client,
            process_iframes,
        }
    }

    /// GET with retries; require 2xx and a supported Content-Type.
    fn get_body(&mut self, url: &str) -> Result<Fetched, FetchError> {
        let response = self
            .client
            .get_with_retry(url)
            .map_err(|e| FetchError::from_send(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let kind = classify_content_type(&content_type).ok_or_else(|| FetchError::NotHtml {
            url: url.to_string(),
            content_type: content_type.clone(),
        })?;
        let body = response.text().map_err(|e| FetchError::BodyRead {
            url: url.to_string(),
            source: e,
        })?;
        Ok(Fetched {
            final_url,
            kind,
            body,
        })
    }

    /// Fetch and convert each iframe document; failures are dropped.
    fn inline_iframes(&mut self, page_url: &str, sources: &[String]) -> Vec<String> {
        let mut parts = Vec::new();
        for src in sources.iter().take(MAX_IFRAMES) {
            let Some(frame_url) = normalize_url(src, page_url) else {
                continue;
            };
            if frame_url == page_url || !frame_url.starts_with("http") {
                continue;
            }
            if let Ok(Fetched {
                kind: BodyKind::Html,
                body,
                ..
            }) = self.get_body(&frame_url)
            {
                let md = html::parse_html(&body).markdown;
                if !md.is_empty() {
                    parts.push(md);
                }
            }
        }
        parts
    }
}

impl PageSource for HttpSource<'_> {
    fn fetch(&mut self, url: &str) -> Result<Page, FetchError> {
        let fetched = self.get_body(url)?;
        match fetched.kind {
            BodyKind::PlainText => Ok(Page {
                url: fetched.final_url,
                base_url: None,
                title: None,
                markdown: fetched.body.trim().to_string(),
                links: Vec::new(),
            }),
            BodyKind::Html => {
                let parsed = html::parse_html(&fetched.body);
                let base_url = parsed
                    .base_href
                    .as_deref()
                    .and_then(|href| normalize_url(href, &fetched.final_url));
                let frame_base = base_url.as_deref().unwrap_or(&fetched.final_url);
                let mut markdown = parsed.markdown;
                if self.process_iframes && !parsed.iframes.is_empty() {
                    for part in self.inline_iframes(frame_base, &parsed.iframes) {
                        if !markdown.is_empty() {
                            markdown.push_str("\n\n");
                        }
                        markdown.push_str(&part);
                    }
                }
                Ok(Page {
                    url: fetched.final_url.clone(),
                    base_url,
                    title: parsed.title,
                    markdown,
                    links: parsed.links,
                })
            }
        }
    }
}
