//! HTTP page fetching with pacing and exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design so the ingestion code never talks to
//! `reqwest` directly:
//! - [`FetchPage`]: Core trait defining async page retrieval
//! - [`HttpFetcher`]: `reqwest` implementation that paces successive requests
//! - [`RetryFetch`]: Decorator that adds retry logic to any `FetchPage` implementation
//!
//! # Status Handling
//!
//! - `200`: the body is returned
//! - `404`: [`FetchError::NotFound`], never retried
//! - any other status, timeouts and connection failures: retried
//!
//! # Pacing
//!
//! [`HttpFetcher`] sleeps a full random delay drawn from its pacing range
//! before every request except the first, however long the previous response
//! took, so the origin never sees back-to-back fetches.

use rand::{rng, Rng};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::StatusCode;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// URL after redirects.
    pub final_url: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page not found: {url}")]
    NotFound { url: String },
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: usize,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Status { .. } | FetchError::Transport { .. })
    }
}

/// Trait for async page retrieval.
///
/// Implementors fetch a URL and return its HTML body. This abstraction
/// allows decorators (like retry logic) and in-memory fakes in tests.
pub trait FetchPage {
    /// Fetch `url`, returning the page or a classified error.
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

/// HTTP settings for [`HttpFetcher`] and [`RetryFetch`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub referer: String,
    pub timeout: Duration,
    /// Random delay range enforced between two requests.
    pub pacing: RangeInclusive<Duration>,
    pub max_attempts: usize,
    /// Delay before the first retry; multiplied by `backoff_factor` for each further one.
    pub backoff_base: Duration,
    pub backoff_factor: u32,
    pub max_backoff: Duration,
}

/// `reqwest`-backed fetcher that paces successive requests.
pub struct HttpFetcher {
    client: reqwest::Client,
    pacing: RangeInclusive<Duration>,
    requested: AtomicBool,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("pacing", &self.pacing)
            .finish()
    }
}

impl HttpFetcher {
    /// Build a client with browser-like headers and the configured timeout.
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        if let Ok(referer) = HeaderValue::from_str(&settings.referer) {
            headers.insert(REFERER, referer);
        }

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            pacing: settings.pacing.clone(),
            requested: AtomicBool::new(false),
        })
    }

    /// Sleep a random pacing delay, unless this is the first request.
    async fn pace(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let (lo, hi) = (*self.pacing.start(), *self.pacing.end());
        let wait = if hi > lo { rng().random_range(lo..=hi) } else { lo };
        if !wait.is_zero() {
            debug!(?wait, "Pacing before request");
            sleep(wait).await;
        }
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        self.pace().await;

        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        let final_url = resp.url().to_string();

        match status {
            StatusCode::OK => {
                let body = resp.text().await.map_err(transport)?;
                debug!(bytes = body.len(), %final_url, "Fetched page");
                Ok(Page { final_url, body })
            }
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
            other => Err(FetchError::Status {
                url: url.to_string(),
                status: other.as_u16(),
            }),
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchPage`] implementation.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * factor^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
///
/// Only retryable errors are retried; a 404 is returned immediately.
pub struct RetryFetch<T> {
    inner: T,
    max_attempts: usize,
    base_delay: Duration,
    factor: u32,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchPage,
{
    /// Wrap `inner`, allowing `max_attempts` attempts in total (at least one).
    pub fn new(inner: T, max_attempts: usize, base_delay: Duration, factor: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
            factor: factor.max(1),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let multiplier = self.factor.saturating_pow(exp);
        let delay = self.base_delay.saturating_mul(multiplier).min(self.max_delay);
        if delay.is_zero() {
            return delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("factor", &self.factor)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchPage for RetryFetch<T>
where
    T: FetchPage,
{
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt >= self.max_attempts {
                        error!(
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(FetchError::Exhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the production fetch stack: paced HTTP client wrapped in retries.
pub fn http_client(settings: &HttpSettings) -> Result<RetryFetch<HttpFetcher>, reqwest::Error> {
    let fetcher = HttpFetcher::new(settings)?;
    info!(
        timeout = ?settings.timeout,
        max_attempts = settings.max_attempts,
        "HTTP client ready"
    );
    Ok(
        RetryFetch::new(fetcher, settings.max_attempts, settings.backoff_base, settings.backoff_factor)
            .with_max_delay(settings.max_backoff),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    /// Scripted in-memory fetcher.
    ///
    /// Each URL maps to a queue of responses consumed in order; the last one
    /// repeats. Unknown URLs are 404s.
    #[derive(Debug, Default)]
    pub struct FakeFetcher {
        responses: RefCell<HashMap<String, VecDeque<Result<Page, u16>>>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn page(self, url: &str, body: &str) -> Self {
            self.respond(url, Ok(body.to_string()))
        }

        pub fn status(self, url: &str, status: u16) -> Self {
            self.respond(url, Err(status))
        }

        fn respond(self, url: &str, response: Result<String, u16>) -> Self {
            let page = response.map(|body| Page {
                final_url: url.to_string(),
                body,
            });
            self.responses
                .borrow_mut()
                .entry(url.to_string())
                .or_default()
                .push_back(page);
            self
        }

        pub fn call_count(&self, url: &str) -> usize {
            self.calls.borrow().iter().filter(|u| *u == url).count()
        }
    }

    impl FetchPage for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            let mut responses = self.responses.borrow_mut();
            let queue = match responses.get_mut(url) {
                Some(q) => q,
                None => return Err(FetchError::NotFound { url: url.to_string() }),
            };
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            match next {
                Some(Ok(page)) => Ok(page),
                Some(Err(404)) | None => Err(FetchError::NotFound { url: url.to_string() }),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
            }
        }
    }
}
