//! Optional config file loading. Search order: ./mdcrawl.toml, then
//! $XDG_CONFIG_HOME/mdcrawl/config.toml (or ~/.config/mdcrawl/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG_FILE: &str = "mdcrawl.toml";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Default output directory when -o is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Number of HTTP attempts for transient failures (default 3).
    pub retry_count: Option<u32>,
    /// Delay in seconds before each retry (e.g. [1, 2]).
    pub retry_backoff_secs: Option<Vec<u64>>,
    /// Page limit for recursive crawls (default 10).
    pub max_pages: Option<usize>,
    /// Link-hop limit for recursive crawls (default unbounded).
    pub max_depth: Option<usize>,
    /// Minimum Markdown length for a page to be saved in recursive crawls (default 100).
    pub min_content_chars: Option<usize>,
    /// Inline iframe documents into the page (default true).
    pub process_iframes: Option<bool>,
}

/// Search order: (1) ./mdcrawl.toml, (2) $XDG_CONFIG_HOME/mdcrawl/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join(LOCAL_CONFIG_FILE)];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("mdcrawl").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            return load_config_file(path).map(Some);
        }
    }
    Ok(None)
}

pub fn load_config_file(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}
