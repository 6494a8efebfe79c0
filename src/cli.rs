//! CLI parsing and orchestration. Resolves seeds, merges flags over config, runs the crawl,
//! and maps errors to exit codes.

use crate::config::{self, Config};
use crate::crawl::{crawl, CrawlEvent, CrawlOptions};
use crate::fetch::{HttpSource, PoliteClient};
use crate::links::parse_seed;
use crate::output::{output_path, OutputError};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OUTPUT_DIR: &str = "docs";
const DEFAULT_MAX_PAGES: usize = 10;
const DEFAULT_MIN_CONTENT_CHARS: usize = 100;
const DEFAULT_DELAY_SECS: u64 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_COUNT: u32 = 3;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No pages could be fetched ({failed} failed).")]
    NothingSaved { failed: usize },

    #[error("{0}")]
    Output(#[from] OutputError),

    #[error("Failed to write JSON summary: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::NothingSaved { .. } => 2,
            CliRunError::Output(_) | CliRunError::Json(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mdcrawl", version)]
#[command(about = "Fetch web pages and save each one as a Markdown file")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs, max_pages, max_depth, min_content_chars, process_iframes) are read from ./mdcrawl.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// URL to crawl.
    pub url: Option<String>,

    /// File with URLs to crawl, one per line. Blank lines and lines starting with # are ignored.
    #[arg(short = 'f', long)]
    pub urls_file: Option<PathBuf>,

    /// Follow same-site links from each URL.
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum number of pages saved by a recursive crawl, across all URLs (default 10).
    /// Pages already on disk are still fetched for their links but do not count.
    #[arg(short, long)]
    pub max_pages: Option<usize>,

    /// Maximum number of link hops from a starting URL in a recursive crawl (default unbounded).
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,

    /// Output directory (default: docs).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite output files that already exist instead of skipping them.
    #[arg(long)]
    pub force: bool,

    /// Minimum Markdown length for a page to be saved in a recursive crawl (default 100).
    #[arg(long)]
    pub min_content: Option<usize>,

    /// Do not fetch and inline iframe content.
    #[arg(long)]
    pub no_iframes: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 1).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the starting URLs and their output paths without fetching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print a JSON summary of the run to stdout.
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

/// Effective run settings after merging CLI flags, config file, and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    output_dir: PathBuf,
    max_pages: usize,
    max_depth: Option<usize>,
    min_content_chars: usize,
    process_iframes: bool,
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
}

fn resolve_settings(args: &Args, config: Option<&Config>) -> Settings {
    Settings {
        output_dir: args
            .output
            .clone()
            .or_else(|| config.and_then(|c| c.output_dir.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        max_pages: args
            .max_pages
            .or_else(|| config.and_then(|c| c.max_pages))
            .unwrap_or(DEFAULT_MAX_PAGES),
        max_depth: args.max_depth.or_else(|| config.and_then(|c| c.max_depth)),
        min_content_chars: args
            .min_content
            .or_else(|| config.and_then(|c| c.min_content_chars))
            .unwrap_or(DEFAULT_MIN_CONTENT_CHARS),
        process_iframes: !args.no_iframes
            && config.and_then(|c| c.process_iframes).unwrap_or(true),
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone())),
        delay_secs: args
            .delay
            .or_else(|| config.and_then(|c| c.request_delay_secs))
            .unwrap_or(DEFAULT_DELAY_SECS),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        retry_count: config
            .and_then(|c| c.retry_count)
            .unwrap_or(DEFAULT_RETRY_COUNT)
            .max(1),
        retry_backoff_secs: config
            .and_then(|c| c.retry_backoff_secs.clone())
            .unwrap_or_else(|| vec![1, 2]),
    }
}

/// URLs from a list file: trimmed, skipping blank lines and `#` comments.
fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

fn load_urls_from_file(path: &Path) -> Result<Vec<String>, CliRunError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CliRunError::InvalidInput(format!("Cannot read URL file {}: {}", path.display(), e))
    })?;
    Ok(parse_url_list(&contents))
}

/// Starting URLs from --urls-file (preferred) or the positional URL, each validated.
fn resolve_seeds(args: &Args) -> Result<Vec<String>, CliRunError> {
    let raw = match (&args.urls_file, &args.url) {
        (Some(file), _) => {
            let urls = load_urls_from_file(file)?;
            if urls.is_empty() {
                return Err(CliRunError::InvalidInput(format!(
                    "No URLs found in {}",
                    file.display()
                )));
            }
            urls
        }
        (None, Some(url)) => vec![url.clone()],
        (None, None) => {
            return Err(CliRunError::InvalidInput(
                "Either provide a URL or use --urls-file".to_string(),
            ))
        }
    };
    raw.iter()
        .map(|u| {
            parse_seed(u).map_err(|reason| {
                CliRunError::InvalidInput(format!(
                    "Invalid URL: {}: {}. Expected an absolute http(s) URL, e.g. https://example.com/docs",
                    u, reason
                ))
            })
        })
        .collect()
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(
            style
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn saved_line(path: &Path, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("✓ Saved: {} ({})", path.display(), title),
        None => format!("✓ Saved: {}", path.display()),
    }
}

/// Render one crawl event. Without a bar (quiet mode) only failures are printed.
fn report_event(bar: Option<&ProgressBar>, recursive: bool, event: &CrawlEvent<'_>) {
    let Some(bar) = bar else {
        if let CrawlEvent::Failed { url, error } = event {
            eprintln!("✗ Error crawling {}: {}", url, error);
        }
        return;
    };
    match event {
        CrawlEvent::Fetching { url, depth, .. } => {
            if recursive {
                bar.set_message(format!("Crawling [depth {}] {}", depth, url));
            } else {
                bar.set_message(format!("Crawling {}", url));
            }
        }
        CrawlEvent::Saved { path, title, .. } => {
            bar.println(saved_line(path, *title));
            bar.inc(1);
        }
        CrawlEvent::SkippedExisting { path, .. } => {
            bar.println(format!("↷ Already exists, skipped: {}", path.display()));
            if !recursive {
                bar.inc(1);
            }
        }
        CrawlEvent::SkippedThin { url, chars } => {
            bar.println(format!(
                "✗ Skipping {} - insufficient content ({} chars)",
                url, chars
            ));
            if !recursive {
                bar.inc(1);
            }
        }
        CrawlEvent::Failed { url, error } => {
            bar.println(format!("✗ Error crawling {}: {}", url, error));
            if !recursive {
                bar.inc(1);
            }
        }
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let seeds = resolve_seeds(args)?;
    if let (Some(file), false) = (&args.urls_file, args.quiet) {
        eprintln!("Loaded {} URLs from {}", seeds.len(), file.display());
    }

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref());

    if args.dry_run {
        for seed in &seeds {
            println!("{} -> {}", seed, output_path(&settings.output_dir, seed).display());
        }
        return Ok(());
    }

    let mut builder = PoliteClient::builder()
        .delay_secs(settings.delay_secs)
        .timeout_secs(settings.timeout_secs)
        .retry_count(settings.retry_count)
        .retry_backoff_secs(settings.retry_backoff_secs.clone());
    if let Some(ua) = settings.user_agent.clone() {
        builder = builder.user_agent(ua);
    }
    let mut client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;
    let mut source = HttpSource::new(&mut client, settings.process_iframes);

    let bar_len = if args.recursive {
        settings.max_pages
    } else {
        seeds.len()
    };
    let bar = if args.quiet {
        None
    } else {
        Some(progress_bar(bar_len))
    };
    let progress: &dyn Fn(&CrawlEvent<'_>) =
        &|event| report_event(bar.as_ref(), args.recursive, event);

    let options = CrawlOptions {
        output_dir: settings.output_dir.clone(),
        recursive: args.recursive,
        max_pages: settings.max_pages,
        max_depth: settings.max_depth,
        min_content_chars: settings.min_content_chars,
        overwrite: args.force,
        progress: Some(progress),
    };
    let result = crawl(&mut source, &seeds, &options);

    if let Some(pb) = bar.as_ref() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }
    let summary = result?;

    if !args.quiet {
        eprintln!(
            "Completed! Saved {} pages ({} already present, {} too short, {} failed). Output: {}",
            summary.saved,
            summary.skipped_existing,
            summary.skipped_thin,
            summary.failed,
            settings.output_dir.display()
        );
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    if summary.nothing_saved() {
        return Err(CliRunError::NothingSaved {
            failed: summary.failed,
        });
    }
    Ok(())
}
