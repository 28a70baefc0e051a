//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a browser-like header set
//! - GET requests with query parameters
//! - Retry with exponential backoff, bounded or unlimited

use crate::config::{FetchConfig, RetryMode};
use crate::{ConfigError, FetchError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use url::Url;

/// Headers sent with every request unless overridden in the config
const BROWSER_HEADERS: [(&str, &str); 8] = [
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Cache-Control", "max-age=0"),
    ("Origin", "https://www.goodschools.com.au/"),
    ("Referer", "https://www.goodschools.com.au/"),
    ("Sec-Fetch-Site", "same-origin"),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "User-Agent",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36",
    ),
];

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Document {
    /// Final URL after redirects
    pub url: Url,

    /// Page body
    pub body: String,
}

impl Document {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// Parses the body into a DOM tree
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// When to give up on a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Keep retrying until a success response arrives
    Unlimited { backoff: Backoff },

    /// Give up after `max_attempts` and report `FetchError::Exhausted`
    Bounded { max_attempts: u32, backoff: Backoff },
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        let backoff = Backoff {
            initial: Duration::from_millis(config.backoff_initial_ms),
            max: Duration::from_millis(config.backoff_max_ms),
        };

        match config.retry {
            RetryMode::Unlimited => Self::Unlimited { backoff },
            RetryMode::Bounded => Self::Bounded {
                max_attempts: config.max_attempts.max(1),
                backoff,
            },
        }
    }

    fn backoff(&self) -> Backoff {
        match self {
            Self::Unlimited { backoff } | Self::Bounded { backoff, .. } => *backoff,
        }
    }

    /// Returns true if another attempt is allowed after `attempt` failures
    fn allows_retry(&self, attempt: u32) -> bool {
        match self {
            Self::Unlimited { .. } => true,
            Self::Bounded { max_attempts, .. } => attempt < *max_attempts,
        }
    }
}

/// Builds an HTTP client carrying the browser header set
///
/// Entries in `config.headers` replace built-in headers of the same name.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        insert_header(&mut headers, name, value)?;
    }
    for (name, value) in &config.headers {
        insert_header(&mut headers, name, value)?;
    }

    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| ConfigError::Validation(format!("cannot build HTTP client: {}", e)))
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ConfigError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::InvalidHeader(format!("bad header name '{}'", name)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| ConfigError::InvalidHeader(format!("bad value for header '{}'", name)))?;
    headers.insert(header_name, header_value);
    Ok(())
}

/// Fetches pages with the configured retry policy
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds the client and policy from configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            build_http_client(config)?,
            RetryPolicy::from_config(config),
        ))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches `url` with `params` as the query string
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the document |
    /// | Non-2xx status | Warn, back off, retry |
    /// | Transport error / timeout | Warn, back off, retry |
    /// | Bounded policy exhausted | Log error, return `FetchError::Exhausted` |
    ///
    /// Under the unlimited policy this only returns `Err` for a malformed URL.
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Document, FetchError> {
        let target = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);

            let error = match self.try_fetch(&target, params).await {
                Ok(document) => return Ok(document),
                Err(e) => e,
            };

            if !self.policy.allows_retry(attempt) {
                tracing::error!(
                    "FATAL: giving up on {} after {} attempts: {}",
                    describe(url, params),
                    attempt,
                    error
                );
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.policy.backoff().delay(attempt);
            tracing::warn!(
                "Error fetching {} (attempt {}): {}. Retrying in {:?}...",
                describe(url, params),
                attempt,
                error,
                delay
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn try_fetch(&self, url: &Url, params: &[(String, String)]) -> Result<Document, String> {
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify(&e))?;

        Ok(Document::new(final_url, body))
    }
}

fn classify(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection refused".to_string()
    } else {
        error.to_string()
    }
}

/// Names a request for log lines: listing pages by page number, others by URL
fn describe(url: &str, params: &[(String, String)]) -> String {
    match params.iter().find(|(key, _)| key == "page") {
        Some((_, page)) => format!("page {}", page),
        None => url.to_string(),
    }
}
