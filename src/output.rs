//! Output files: one Markdown file per page, named after the URL path.

use reqwest::Url;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stem length cap, leaving room for the extension under the common 255-byte limit.
const MAX_STEM_BYTES: usize = 200;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Filename for a page: the URL path with `/` (and characters most
/// filesystems reject) turned into `_`, outer `_` trimmed, `index` for the
/// root, and a `.md` extension.
pub fn safe_filename(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let replaced: String = path
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let mut stem = replaced.trim_matches('_').to_string();
    if stem.is_empty() {
        stem = "index".to_string();
    }
    if stem.len() > MAX_STEM_BYTES {
        let mut cut = MAX_STEM_BYTES;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
    }
    if stem.ends_with(".md") {
        stem
    } else {
        format!("{}.md", stem)
    }
}

pub fn output_path(dir: &Path, url: &str) -> PathBuf {
    dir.join(safe_filename(url))
}

pub fn ensure_output_dir(dir: &Path) -> Result<(), OutputError> {
    std::fs::create_dir_all(dir).map_err(|e| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Write a page as `# {url}`, a blank line, then the Markdown body.
pub fn write_page(path: &Path, url: &str, markdown: &str) -> Result<(), OutputError> {
    let io_err = |e| OutputError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut f = File::create(path).map_err(io_err)?;
    writeln!(f, "# {}", url).map_err(io_err)?;
    writeln!(f).map_err(io_err)?;
    f.write_all(markdown.as_bytes()).map_err(io_err)?;
    if !markdown.ends_with('\n') {
        writeln!(f).map_err(io_err)?;
    }
    Ok(())
}
