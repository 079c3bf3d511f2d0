//! Page fetcher implementations
//!
//! This module defines the engine seam used by the crawler, including:
//! - The `PageFetcher` trait and its error classification
//! - Building HTTP clients with the configured user agent string
//! - The plain HTTP engine with manual, re-validated redirect handling

use crate::config::UserAgentConfig;
use crate::url::{SafetyValidator, Verdict};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirect hops followed for one fetch
pub const MAX_REDIRECTS: usize = 10;

/// Errors a page engine can report
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The engine did not produce a page in time
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The engine could not be started or has gone away
    #[error("page engine unavailable: {0}")]
    DriverUnavailable(String),

    /// The page could not be loaded (network, HTTP status, content type, redirects)
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// A page as returned by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects; relative links resolve against it
    pub final_url: Url,

    /// Page HTML (rendered DOM for the browser engine)
    pub html: String,
}

/// A page rendering engine
///
/// The crawler owns exactly one fetcher per run and calls [`PageFetcher::close`]
/// on every exit path.
#[async_trait]
pub trait PageFetcher: Send {
    /// Loads one page
    async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Releases engine resources; further fetches may relaunch them
    async fn close(&mut self);
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total per-request timeout
///
/// # Example
///
/// ```no_run
/// use site_harvest::config::UserAgentConfig;
/// use site_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP engine
///
/// # Request Flow
///
/// | Condition | Result |
/// |-----------|--------|
/// | 3xx with Location | Follow (max 10 hops), re-validating each target |
/// | Redirect to a visited URL | Navigation (loop) |
/// | Redirect to an unsafe target | Navigation |
/// | Non-2xx | Navigation |
/// | Content-Type present and not HTML | Navigation |
/// | Client timeout | Timeout |
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
    validator: Option<SafetyValidator>,
}

impl HttpFetcher {
    /// Creates an engine over an existing client
    pub fn new(client: Client, timeout_secs: u64) -> Self {
        Self {
            client,
            timeout_secs,
            validator: None,
        }
    }

    /// Creates an engine from the user agent configuration
    pub fn from_config(config: &UserAgentConfig, timeout_secs: u64) -> Result<Self, FetchError> {
        let client = build_http_client(config, Duration::from_secs(timeout_secs))
            .map_err(|e| FetchError::DriverUnavailable(e.to_string()))?;
        Ok(Self::new(client, timeout_secs))
    }

    /// Validates every redirect target before following it
    pub fn with_validator(mut self, validator: SafetyValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                secs: self.timeout_secs,
            }
        } else if error.is_connect() {
            FetchError::Navigation(format!("connection failed: {}", error))
        } else {
            FetchError::Navigation(error.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut current = url.clone();
        let mut seen = HashSet::new();
        seen.insert(current.as_str().to_string());

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| self.classify(e))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        FetchError::Navigation(format!(
                            "HTTP {} without Location from {}",
                            status.as_u16(),
                            current
                        ))
                    })?;

                let next = current.join(location).map_err(|e| {
                    FetchError::Navigation(format!("bad redirect target '{}': {}", location, e))
                })?;

                if !seen.insert(next.as_str().to_string()) {
                    return Err(FetchError::Navigation(format!("redirect loop at {}", next)));
                }

                if let Some(validator) = &self.validator {
                    if let Verdict::Rejected(reason) = validator.validate(&next).await {
                        return Err(FetchError::Navigation(format!(
                            "redirect to unsafe target {}: {}",
                            next, reason
                        )));
                    }
                }

                tracing::debug!(from = %current, to = %next, "Following redirect");
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Navigation(format!(
                    "HTTP {} for {}",
                    status.as_u16(),
                    current
                )));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_ascii_lowercase());

            if let Some(ct) = content_type {
                if !ct.contains("html") {
                    return Err(FetchError::Navigation(format!("expected HTML, got {}", ct)));
                }
            }

            let html = response.text().await.map_err(|e| self.classify(e))?;
            return Ok(FetchedPage {
                final_url: current,
                html,
            });
        }

        Err(FetchError::Navigation(format!(
            "more than {} redirects from {}",
            MAX_REDIRECTS, url
        )))
    }

    async fn close(&mut self) {}
}
