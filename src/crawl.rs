//! Queue-driven crawl: breadth-first over a FIFO queue with a seen set.
//!
//! 1. Seeds go on the queue at depth 0, each acting as the root for links found under it
//! 2. Each URL is fetched through a [PageSource] and written with [write_page]
//! 3. In recursive mode, same-site links of saved pages are queued until the
//!    depth or page limit is reached

use crate::fetch::{FetchError, PageSource};
use crate::links::{is_valid_link, normalize_url};
use crate::model::{CrawlSummary, Page};
use crate::output::{ensure_output_dir, output_path, write_page, OutputError};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Progress notifications emitted while crawling.
#[derive(Debug)]
pub enum CrawlEvent<'a> {
    Fetching {
        url: &'a str,
        depth: usize,
        /// Pages saved so far.
        saved: usize,
    },
    Saved {
        url: &'a str,
        path: &'a Path,
        title: Option<&'a str>,
    },
    SkippedExisting {
        url: &'a str,
        path: &'a Path,
    },
    SkippedThin {
        url: &'a str,
        chars: usize,
    },
    Failed {
        url: &'a str,
        error: &'a FetchError,
    },
}

/// Options for a crawl run.
pub struct CrawlOptions<'a> {
    pub output_dir: PathBuf,
    /// Follow same-site links; otherwise only the seeds are fetched.
    pub recursive: bool,
    /// Stop a recursive crawl once this many pages have been saved.
    /// Pages whose output file already exists are still fetched for their
    /// links but do not count toward this limit.
    pub max_pages: usize,
    /// Maximum link hops from a seed. None means unbounded.
    pub max_depth: Option<usize>,
    /// Recursive mode saves a page only when its trimmed Markdown is longer than this.
    pub min_content_chars: usize,
    /// Rewrite output files that already exist instead of skipping them.
    pub overwrite: bool,
    pub progress: Option<&'a dyn Fn(&CrawlEvent<'_>)>,
}

impl CrawlOptions<'_> {
    fn report(&self, event: CrawlEvent<'_>) {
        if let Some(cb) = self.progress {
            cb(&event);
        }
    }
}

#[derive(Debug, Clone)]
struct CrawlItem {
    url: String,
    depth: usize,
    /// Seed this URL was discovered from; links must stay on its host.
    root: String,
}

/// Crawl from `seeds` and write one Markdown file per page into `options.output_dir`.
///
/// Fetch failures are reported and counted; only output errors abort the run.
pub fn crawl(
    source: &mut dyn PageSource,
    seeds: &[String],
    options: &CrawlOptions<'_>,
) -> Result<CrawlSummary, OutputError> {
    ensure_output_dir(&options.output_dir)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<CrawlItem> = VecDeque::new();
    for seed in seeds {
        if seen.insert(seed.clone()) {
            queue.push_back(CrawlItem {
                url: seed.clone(),
                depth: 0,
                root: seed.clone(),
            });
        }
    }

    let mut summary = CrawlSummary::default();

    while let Some(item) = queue.pop_front() {
        if options.recursive && summary.saved >= options.max_pages {
            break;
        }
        summary.visited += 1;

        let path = output_path(&options.output_dir, &item.url);
        let already_written = !options.overwrite && path.exists();
        if already_written && !options.recursive {
            summary.skipped_existing += 1;
            options.report(CrawlEvent::SkippedExisting {
                url: &item.url,
                path: &path,
            });
            continue;
        }

        options.report(CrawlEvent::Fetching {
            url: &item.url,
            depth: item.depth,
            saved: summary.saved,
        });
        let page = match source.fetch(&item.url) {
            Ok(page) => page,
            Err(error) => {
                summary.failed += 1;
                options.report(CrawlEvent::Failed {
                    url: &item.url,
                    error: &error,
                });
                continue;
            }
        };
        if page.url != item.url {
            // Redirected: the final URL is visited too.
            seen.insert(page.url.clone());
        }

        if already_written {
            // Kept as-is; still walked for links so a re-run reaches new pages.
            summary.skipped_existing += 1;
            options.report(CrawlEvent::SkippedExisting {
                url: &item.url,
                path: &path,
            });
        } else if has_enough_content(&page.markdown, options) {
            write_page(&path, &page.url, &page.markdown)?;
            summary.saved += 1;
            options.report(CrawlEvent::Saved {
                url: &item.url,
                path: &path,
                title: page.title.as_deref(),
            });
        } else {
            summary.skipped_thin += 1;
            options.report(CrawlEvent::SkippedThin {
                url: &item.url,
                chars: page.markdown.trim().chars().count(),
            });
            continue;
        }

        let within_depth = options.max_depth.map_or(true, |max| item.depth < max);
        if options.recursive && within_depth {
            for link in follow_links(&page, &item.root) {
                if seen.insert(link.clone()) {
                    queue.push_back(CrawlItem {
                        url: link,
                        depth: item.depth + 1,
                        root: item.root.clone(),
                    });
                }
            }
        }
    }

    Ok(summary)
}

fn has_enough_content(markdown: &str, options: &CrawlOptions<'_>) -> bool {
    let chars = markdown.trim().chars().count();
    if options.recursive {
        chars > options.min_content_chars
    } else {
        chars > 0
    }
}

/// Links of `page` worth queuing: resolved against the page's final URL (or
/// its `<base href>`) and kept on the root's host.
fn follow_links(page: &Page, root: &str) -> Vec<String> {
    page.links
        .iter()
        .filter_map(|raw| normalize_url(raw, page.link_base()))
        .filter(|url| is_valid_link(url, root))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::html::parse_html;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::error::Error;

    const FILLER: &str = "This page documents a feature in enough detail that the converted \
        Markdown clears the minimum content threshold used by recursive crawls.";

    /// In-memory site: URL -> HTML. Unknown URLs fail with HTTP 404.
    struct FakeSite {
        pages: HashMap<String, String>,
        /// Requested URL -> URL the page is served from.
        redirects: HashMap<String, String>,
        fetched: Vec<String>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.clone()))
                    .collect(),
                redirects: HashMap::new(),
                fetched: Vec::new(),
            }
        }

        fn with_redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }
    }

    impl PageSource for FakeSite {
        fn fetch(&mut self, url: &str) -> Result<Page, FetchError> {
            self.fetched.push(url.to_string());
            let served = self.redirects.get(url).map_or(url, String::as_str);
            let html = self.pages.get(served).ok_or_else(|| FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })?;
            let parsed = parse_html(html);
            Ok(Page {
                url: served.to_string(),
                base_url: None,
                title: parsed.title,
                markdown: parsed.markdown,
                links: parsed.links,
            })
        }
    }

    fn page(heading: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<li><a href="{}">{}</a></li>"#, l, l))
            .collect();
        format!(
            "<html><body><h1>{}</h1><p>{}</p><ul>{}</ul></body></html>",
            heading, FILLER, anchors
        )
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("mdcrawl_crawl_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        dir
    }

    fn options<'a>(dir: &Path, recursive: bool) -> CrawlOptions<'a> {
        CrawlOptions {
            output_dir: dir.to_path_buf(),
            recursive,
            max_pages: 10,
            max_depth: None,
            min_content_chars: 100,
            overwrite: false,
            progress: None,
        }
    }

    fn seeds(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn docs_site() -> FakeSite {
        FakeSite::new(&[
            (
                "https://docs.example.com/",
                page("Home", &["/guide", "/api", "https://other.org/page"]),
            ),
            (
                "https://docs.example.com/guide",
                page("Guide", &["/guide/advanced", "/api#methods", "/"]),
            ),
            (
                "https://docs.example.com/api",
                page("API", &["/guide"]).replace(
                    "<html>",
                    "<html><head><title>API reference</title></head>",
                ),
            ),
            (
                "https://docs.example.com/guide/advanced",
                page("Advanced", &["/deep"]),
            ),
            ("https://docs.example.com/deep", page("Deep", &[])),
        ])
    }

    #[test]
    fn list_mode_saves_each_seed_without_following() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("list");
        let mut site = docs_site();
        let summary = crawl(
            &mut site,
            &seeds(&["https://docs.example.com/", "https://docs.example.com/api"]),
            &options(&dir, false),
        )?;
        assert_eq!(summary.saved, 2);
        assert_eq!(site.fetched.len(), 2);
        assert!(dir.join("index.md").exists());
        let api = std::fs::read_to_string(dir.join("api.md"))?;
        std::fs::remove_dir_all(&dir).ok();
        assert!(api.starts_with("# https://docs.example.com/api\n\n"));
        assert!(api.contains("API"));
        Ok(())
    }

    #[test]
    fn list_mode_skips_existing_without_fetching() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("list_existing");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("api.md"), "kept")?;
        let mut site = docs_site();
        let summary = crawl(
            &mut site,
            &seeds(&["https://docs.example.com/api"]),
            &options(&dir, false),
        )?;
        let kept = std::fs::read_to_string(dir.join("api.md"))?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.saved, 0);
        assert!(site.fetched.is_empty());
        assert_eq!(kept, "kept");
        Ok(())
    }

    #[test]
    fn overwrite_rewrites_existing_file() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("overwrite");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("api.md"), "stale")?;
        let mut site = docs_site();
        let mut opts = options(&dir, false);
        opts.overwrite = true;
        let summary = crawl(&mut site, &seeds(&["https://docs.example.com/api"]), &opts)?;
        let written = std::fs::read_to_string(dir.join("api.md"))?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.saved, 1);
        assert!(written.starts_with("# https://docs.example.com/api"));
        Ok(())
    }

    #[test]
    fn recursive_is_breadth_first_and_same_host() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("bfs");
        let mut site = docs_site();
        let summary = crawl(
            &mut site,
            &seeds(&["https://docs.example.com/"]),
            &options(&dir, true),
        )?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(
            site.fetched,
            vec![
                "https://docs.example.com/",
                "https://docs.example.com/guide",
                "https://docs.example.com/api",
                "https://docs.example.com/guide/advanced",
                "https://docs.example.com/deep",
            ]
        );
        assert_eq!(summary.saved, 5);
        assert_eq!(summary.visited, 5);
        assert_eq!(summary.failed, 0);
        Ok(())
    }

    #[test]
    fn recursive_stops_at_max_pages() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("max_pages");
        let mut site = docs_site();
        let mut opts = options(&dir, true);
        opts.max_pages = 2;
        let summary = crawl(&mut site, &seeds(&["https://docs.example.com/"]), &opts)?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.saved, 2);
        assert_eq!(site.fetched.len(), 2);
        Ok(())
    }

    #[test]
    fn existing_pages_do_not_count_toward_max_pages() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("max_pages_existing");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("index.md"), "from an earlier run")?;
        let mut site = docs_site();
        let mut opts = options(&dir, true);
        opts.max_pages = 2;
        let summary = crawl(&mut site, &seeds(&["https://docs.example.com/"]), &opts)?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.saved, 2);
        assert_eq!(site.fetched.len(), 3);
        Ok(())
    }

    #[test]
    fn links_resolve_against_redirected_url() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("redirect");
        let mut site = FakeSite::new(&[
            (
                "https://docs.example.com/docs/",
                page("Docs", &["intro", "/docs/"]),
            ),
            ("https://docs.example.com/docs/intro", page("Intro", &[])),
            ("https://docs.example.com/intro", page("Wrong intro", &[])),
        ])
        .with_redirect(
            "https://docs.example.com/docs",
            "https://docs.example.com/docs/",
        );
        let summary = crawl(
            &mut site,
            &seeds(&["https://docs.example.com/docs"]),
            &options(&dir, true),
        )?;
        let saved = std::fs::read_to_string(dir.join("docs.md"))?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(
            site.fetched,
            vec![
                "https://docs.example.com/docs",
                "https://docs.example.com/docs/intro",
            ]
        );
        assert_eq!(summary.saved, 2);
        assert!(saved.starts_with("# https://docs.example.com/docs/\n\n"));
        Ok(())
    }

    #[test]
    fn recursive_respects_max_depth() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("max_depth");
        let mut site = docs_site();
        let mut opts = options(&dir, true);
        opts.max_depth = Some(1);
        let summary = crawl(&mut site, &seeds(&["https://docs.example.com/"]), &opts)?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.saved, 3);
        assert!(!site
            .fetched
            .contains(&"https://docs.example.com/guide/advanced".to_string()));
        Ok(())
    }

    #[test]
    fn max_depth_zero_fetches_only_seeds() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("depth_zero");
        let mut site = docs_site();
        let mut opts = options(&dir, true);
        opts.max_depth = Some(0);
        crawl(&mut site, &seeds(&["https://docs.example.com/"]), &opts)?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(site.fetched, vec!["https://docs.example.com/"]);
        Ok(())
    }

    #[test]
    fn each_seed_uses_its_own_host() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("roots");
        let mut site = FakeSite::new(&[
            ("https://a.example/", page("A", &["/one"])),
            ("https://a.example/one", page("A one", &[])),
            ("https://b.example/", page("B", &["/two", "https://a.example/x"])),
            ("https://b.example/two", page("B two", &[])),
        ]);
        let summary = crawl(
            &mut site,
            &seeds(&["https://a.example/", "https://b.example/"]),
            &options(&dir, true),
        )?;
        std::fs::remove_dir_all(&dir).ok();
        assert!(site.fetched.contains(&"https://b.example/two".to_string()));
        assert!(!site.fetched.contains(&"https://a.example/x".to_string()));
        // Both seeds map to index.md; the second is left alone.
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.saved, 3);
        Ok(())
    }

    #[test]
    fn thin_pages_are_skipped_and_not_followed() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("thin");
        let mut site = FakeSite::new(&[
            (
                "https://x.example/",
                r#"<html><body><a href="/next">next</a></body></html>"#.to_string(),
            ),
            ("https://x.example/next", page("Next", &[])),
        ]);
        let summary = crawl(
            &mut site,
            &seeds(&["https://x.example/"]),
            &options(&dir, true),
        )?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.skipped_thin, 1);
        assert_eq!(summary.saved, 0);
        assert_eq!(site.fetched, vec!["https://x.example/"]);
        Ok(())
    }

    #[test]
    fn list_mode_keeps_short_pages() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("short");
        let mut site = FakeSite::new(&[(
            "https://x.example/short",
            "<html><body><p>Tiny.</p></body></html>".to_string(),
        )]);
        let summary = crawl(
            &mut site,
            &seeds(&["https://x.example/short"]),
            &options(&dir, false),
        )?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.saved, 1);
        Ok(())
    }

    #[test]
    fn failures_are_counted_and_crawl_continues() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("failures");
        let mut site = docs_site();
        let summary = crawl(
            &mut site,
            &seeds(&["https://docs.example.com/missing", "https://docs.example.com/api"]),
            &options(&dir, false),
        )?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.saved, 1);
        assert!(!summary.nothing_saved());
        Ok(())
    }

    #[test]
    fn recursive_walks_existing_pages_for_links() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("resume");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("index.md"), "from an earlier run")?;
        let mut site = docs_site();
        let mut opts = options(&dir, true);
        opts.max_depth = Some(1);
        let summary = crawl(&mut site, &seeds(&["https://docs.example.com/"]), &opts)?;
        let index = std::fs::read_to_string(dir.join("index.md"))?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(index, "from an earlier run");
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.saved, 2);
        Ok(())
    }

    #[test]
    fn duplicate_seeds_and_links_are_fetched_once() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("dupes");
        let mut site = docs_site();
        crawl(
            &mut site,
            &seeds(&["https://docs.example.com/", "https://docs.example.com/"]),
            &options(&dir, true),
        )?;
        std::fs::remove_dir_all(&dir).ok();
        let unique: HashSet<&String> = site.fetched.iter().collect();
        assert_eq!(unique.len(), site.fetched.len());
        Ok(())
    }

    #[test]
    fn progress_reports_each_outcome() -> Result<(), Box<dyn Error>> {
        let dir = scratch_dir("events");
        let log: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let record: &dyn Fn(&CrawlEvent<'_>) = &|event| {
            let line = match event {
                CrawlEvent::Fetching { url, .. } => format!("fetch {}", url),
                CrawlEvent::Saved { url, title, .. } => {
                    format!("saved {} ({})", url, title.unwrap_or("-"))
                }
                CrawlEvent::SkippedExisting { url, .. } => format!("exists {}", url),
                CrawlEvent::SkippedThin { url, .. } => format!("thin {}", url),
                CrawlEvent::Failed { url, .. } => format!("failed {}", url),
            };
            log.borrow_mut().push(line);
        };
        let mut site = docs_site();
        let mut opts = options(&dir, false);
        opts.progress = Some(record);
        crawl(
            &mut site,
            &seeds(&["https://docs.example.com/api", "https://docs.example.com/gone"]),
            &opts,
        )?;
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(
            *log.borrow(),
            vec![
                "fetch https://docs.example.com/api",
                "saved https://docs.example.com/api (API reference)",
                "fetch https://docs.example.com/gone",
                "failed https://docs.example.com/gone",
            ]
        );
        Ok(())
    }
}
