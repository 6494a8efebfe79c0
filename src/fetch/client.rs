//! Blocking HTTP client with a minimum delay between requests and retries for transient failures.

use std::time::{Duration, Instant};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; mdcrawl/0.1)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: u64 = 1;
const MAX_REDIRECTS: usize = 10;

/// Default number of attempts for get_with_retry (initial plus retries).
const DEFAULT_RETRY_COUNT: u32 = 3;
const DEFAULT_BACKOFF_SECS: [u64; 2] = [1, 2];
/// Backoff for HTTP 429 (rate limit): wait longer so the server can recover.
const BACKOFF_429_SECS: [u64; 4] = [30, 60, 90, 120];

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
    retry_count: u32,
    backoff_secs: Vec<u64>,
}

impl PoliteClient {
    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    /// Perform a single GET request after waiting out the politeness delay.
    pub fn get(&mut self, url: &str) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.wait_delay();
        let response = self.inner.get(url).send();
        self.last_request = Some(Instant::now());
        response
    }

    /// Perform a GET request with retries for transient failures.
    ///
    /// Retries on timeout, connection errors, HTTP 5xx, and HTTP 429. The last
    /// attempt's outcome is returned as-is, so a final 5xx comes back as a
    /// response for the caller to inspect. Other errors are returned immediately.
    pub fn get_with_retry(
        &mut self,
        url: &str,
    ) -> Result<reqwest::blocking::Response, reqwest::Error> {
        let max_attempts = self.retry_count.max(1);
        let mut attempt: u32 = 0;
        loop {
            let is_last = attempt + 1 >= max_attempts;
            match self.get(url) {
                Ok(response) => {
                    let status = response.status();
                    let rate_limited = status.as_u16() == 429;
                    if (status.is_server_error() || rate_limited) && !is_last {
                        let backoff = if rate_limited {
                            backoff_at(&BACKOFF_429_SECS, attempt, 60)
                        } else {
                            backoff_at(&self.backoff_secs, attempt, 1)
                        };
                        std::thread::sleep(Duration::from_secs(backoff));
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && !is_last {
                        std::thread::sleep(Duration::from_secs(backoff_at(
                            &self.backoff_secs,
                            attempt,
                            1,
                        )));
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    fn wait_delay(&self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

/// Backoff for the given attempt; reuses the last entry when the table is shorter.
fn backoff_at(table: &[u64], attempt: u32, fallback: u64) -> u64 {
    table
        .get(attempt as usize)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(fallback)
}

/// Builder for PoliteClient with optional User-Agent, delay, timeout, and retry settings.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
    no_proxy: bool,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
            no_proxy: false,
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set delay between requests in seconds. Default 1.
    pub fn delay_secs(mut self, secs: u64) -> Self {
        self.delay_secs = secs;
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set number of HTTP attempts for transient failures (default 3).
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n.max(1);
        self
    }

    /// Backoff delays in seconds before each retry. If shorter than retry_count - 1, the last value is reused.
    pub fn retry_backoff_secs(mut self, secs: Vec<u64>) -> Self {
        self.retry_backoff_secs = secs;
        self
    }

    /// Ignore proxy environment variables, so loopback test servers are reached directly.
    #[cfg(test)]
    pub(crate) fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if self.no_proxy {
            inner = inner.no_proxy();
        }
        let inner = inner.build()?;
        let backoff_secs = if self.retry_backoff_secs.is_empty() {
            // 1, 2, 4, ... for (retry_count - 1) steps
            let n = self.retry_count.saturating_sub(1) as usize;
            (0..n).map(|i| 1u64 << i.min(4)).collect::<Vec<_>>()
        } else {
            self.retry_backoff_secs
        };
        Ok(PoliteClient {
            inner,
            delay: Duration::from_secs(self.delay_secs),
            last_request: None,
            retry_count: self.retry_count,
            backoff_secs,
        })
    }
}
