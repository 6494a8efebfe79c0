//! Link resolution and the same-site filter used when following links.

use reqwest::Url;

/// Path endings never worth converting to Markdown.
const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".css", ".js",
    ".mp4", ".mp3", ".tar", ".gz",
];

/// Resolve a raw link against the page it was found on.
///
/// Absolute links are kept (re-serialized); relative links are joined onto
/// `base` and must come out as http(s). The fragment is always removed so
/// `page#a` and `page#b` are the same queue entry.
pub fn normalize_url(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => {
            let base = Url::parse(base).ok()?;
            let joined = base.join(raw).ok()?;
            if !matches!(joined.scheme(), "http" | "https") {
                return None;
            }
            joined
        }
    };
    url.set_fragment(None);
    Some(url.to_string())
}

/// Parse a seed URL. Only absolute http(s) URLs with a host are accepted.
/// The fragment is dropped, as for discovered links.
pub fn parse_seed(input: &str) -> Result<String, String> {
    let mut url = Url::parse(input.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL has no host".to_string());
    }
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Whether a normalized link should be followed from a crawl rooted at `root`.
pub fn is_valid_link(url: &str, root: &str) -> bool {
    let (Ok(parsed), Ok(root)) = (Url::parse(url), Url::parse(root)) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    match (parsed.host_str(), root.host_str()) {
        (Some(a), Some(b)) if a == b && parsed.port() == root.port() => {}
        _ => return false,
    }
    let path = parsed.path();
    if path.is_empty() || path == "/" {
        return false;
    }
    if parsed.query().is_some() {
        return false;
    }
    if path.contains("javascript:") || path.contains("mailto:") {
        return false;
    }
    let lower = path.to_ascii_lowercase();
    !SKIPPED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
