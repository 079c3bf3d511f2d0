//! Crawler module for bounded site crawling
//!
//! This module contains the core crawling logic, including:
//! - Page engines (plain HTTP, or headless Chromium behind the `browser` feature)
//! - HTML content and link extraction
//! - The breadth-first frontier
//! - Overall crawl coordination

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use coordinator::{CrawlOutcome, CrawlSettings, Crawler};
pub use extractor::{extract, ExtractError, ExtractedPage, MAX_DOCUMENT_BYTES};
pub use fetcher::{
    build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher, MAX_REDIRECTS,
};
pub use frontier::{Frontier, FrontierEntry, Offer};

use crate::config::{Config, FetchEngine};
use crate::storage::allocate_site_dir;
use crate::url::{netloc, normalize_url, SafetyValidator};
use crate::{HarvestError, UrlError};
use std::path::PathBuf;
use url::Url;

/// Builds the page engine selected in the configuration
///
/// The HTTP engine re-validates every redirect hop with `validator`; the
/// browser engine validates the URL it finally landed on.
pub fn build_fetcher(
    config: &Config,
    validator: SafetyValidator,
) -> Result<Box<dyn PageFetcher>, FetchError> {
    match config.crawler.engine {
        FetchEngine::Http => {
            let fetcher =
                HttpFetcher::from_config(&config.user_agent, config.crawler.fetch_timeout_secs)?
                    .with_validator(validator);
            Ok(Box::new(fetcher))
        }
        #[cfg(feature = "browser")]
        FetchEngine::Browser => Ok(Box::new(
            BrowserFetcher::new(&config.user_agent).with_validator(validator),
        )),
        #[cfg(not(feature = "browser"))]
        FetchEngine::Browser => Err(FetchError::DriverUnavailable(
            "built without the `browser` feature".to_string(),
        )),
    }
}

/// Parses the seed URL given on the command line
///
/// A well-formed HTTP(S) URL is normalized. A well-formed URL with another
/// scheme is returned as is, so the crawl rejects it through the safety
/// validator and still leaves a `failed` manifest.
pub fn parse_seed(seed: &str) -> Result<Url, UrlError> {
    match normalize_url(seed) {
        Ok(url) => Ok(url),
        Err(UrlError::InvalidScheme(_)) => {
            let url = Url::parse(seed).map_err(|e| UrlError::Parse(e.to_string()))?;
            if url.host_str().map_or(true, str::is_empty) {
                return Err(UrlError::MissingDomain);
            }
            Ok(url)
        }
        Err(e) => Err(e),
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Parse and normalize the seed URL
/// 2. Allocate the site directory (or use `site_dir` when given)
/// 3. Build the page engine
/// 4. Crawl breadth-first and store pages
/// 5. Write the manifest
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seed` - The seed URL as given by the user
/// * `site_dir` - Explicit output directory, created if missing
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - A manifest was written (status may be `failed`)
/// * `Err(HarvestError)` - The seed is malformed or the manifest could not be written
pub async fn run_crawl(
    config: &Config,
    seed: &str,
    site_dir: Option<PathBuf>,
) -> Result<CrawlOutcome, HarvestError> {
    let seed = parse_seed(seed)?;

    let site_dir = match site_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => allocate_site_dir(&config.output.base_dir, &netloc(&seed))?,
    };

    let validator = SafetyValidator::default();
    let fetcher = build_fetcher(config, validator.clone()).map_err(|source| HarvestError::Fetch {
        url: seed.to_string(),
        source,
    })?;

    let mut crawler = Crawler::new(CrawlSettings::from(&config.crawler), validator, fetcher);
    crawler.run(&seed, &site_dir).await
}
