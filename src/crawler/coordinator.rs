//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates one run:
//! - Driving the breadth-first frontier within the page and depth bounds
//! - Gating every fetch on the safety validator
//! - Fetching under a hard timeout, extracting, and storing each page
//! - Filtering discovered links to the site scope
//! - Writing the manifest exactly once at the end

use crate::config::{CrawlerConfig, OriginScope};
use crate::crawler::extractor::{extract, ExtractedPage};
use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::crawler::frontier::{Frontier, Offer};
use crate::output::{write_manifest, CrawlManifest, CrawlStatistics};
use crate::state::{CrawlStatus, Termination};
use crate::storage::{FsPageStore, PageStore, StoredPage};
use crate::url::{normalize, SafetyValidator, SiteScope, Verdict};
use crate::HarvestError;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Bounds and policies for one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub max_pages: u32,
    pub max_depth: u32,
    pub fetch_timeout: Duration,
    pub origin_scope: OriginScope,
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            origin_scope: config.origin_scope,
        }
    }
}

/// Result of a crawl run whose manifest was written
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub manifest: CrawlManifest,
    pub manifest_path: PathBuf,
}

impl CrawlOutcome {
    pub fn status(&self) -> CrawlStatus {
        self.manifest.status
    }

    pub fn termination(&self) -> Option<Termination> {
        self.manifest.termination
    }
}

/// Main crawler structure
///
/// Owns exactly one page engine for the run and releases it on every exit
/// path of [`Crawler::run`].
pub struct Crawler {
    settings: CrawlSettings,
    validator: SafetyValidator,
    fetcher: Box<dyn PageFetcher>,
}

impl Crawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `settings` - Page, depth and timeout bounds
    /// * `validator` - Gate applied before every fetch
    /// * `fetcher` - The page engine for this run
    pub fn new(
        settings: CrawlSettings,
        validator: SafetyValidator,
        fetcher: Box<dyn PageFetcher>,
    ) -> Self {
        Self {
            settings,
            validator,
            fetcher,
        }
    }

    /// Runs one crawl from `seed`, writing pages and the manifest into `site_dir`
    ///
    /// `seed` must be normalized. `site_dir` must exist.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - Manifest written; its status may still be `failed`
    /// * `Err(HarvestError)` - The run could not produce a manifest
    pub async fn run(&mut self, seed: &Url, site_dir: &Path) -> Result<CrawlOutcome, HarvestError> {
        let result = self.run_inner(seed, site_dir).await;
        self.fetcher.close().await;
        result
    }

    async fn run_inner(&mut self, seed: &Url, site_dir: &Path) -> Result<CrawlOutcome, HarvestError> {
        let scope = SiteScope::for_seed(seed, self.settings.origin_scope)?;
        let max_pages = self.settings.max_pages as usize;

        let mut frontier = Frontier::new(seed.clone(), self.settings.max_depth);
        let mut store = FsPageStore::new(site_dir, seed.clone());
        let mut pages: Vec<StoredPage> = Vec::new();
        let mut stats = CrawlStatistics::default();
        let start_time = Instant::now();

        info!(seed = %seed, site_dir = %site_dir.display(), "Starting crawl");

        let termination = loop {
            if pages.len() >= max_pages {
                info!("Reached max page limit ({})", max_pages);
                break Termination::ExhaustedByCount;
            }

            let Some(entry) = frontier.next_entry() else {
                break frontier.exhaustion();
            };
            let is_seed = entry.depth == 0;

            if let Verdict::Rejected(reason) = self.validator.validate(&entry.url).await {
                if is_seed {
                    error!(url = %entry.url, %reason, "Seed URL rejected");
                    break Termination::SeedRejected;
                }
                warn!(url = %entry.url, %reason, "Skipping unsafe URL");
                stats.pages_rejected += 1;
                continue;
            }

            debug!(url = %entry.url, depth = entry.depth, "Fetching");
            let extracted = match self.fetch_page(&entry.url).await {
                Ok(page) => page,
                Err(e) if is_seed => {
                    error!(error = %e, "Seed URL could not be loaded");
                    break Termination::SeedUnreachable;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping page");
                    stats.pages_failed += 1;
                    continue;
                }
            };

            match store.store(&extracted.record, entry.depth) {
                Ok(page) => {
                    info!(
                        "Crawled {}/{} (depth {}): {} -> {}",
                        pages.len() + 1,
                        max_pages,
                        entry.depth,
                        page.url,
                        page.folder
                    );
                    pages.push(page);
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "Failed to store page, skipping");
                    stats.pages_failed += 1;
                    continue;
                }
            }

            for link in extracted.links {
                stats.links_discovered += 1;

                let link = match normalize(link) {
                    Ok(link) => link,
                    Err(e) => {
                        debug!(error = %e, "Dropping unnormalizable link");
                        continue;
                    }
                };

                if !scope.contains(&link) {
                    debug!(url = %link, "Out of scope");
                    stats.links_out_of_scope += 1;
                    continue;
                }

                match frontier.offer(link, entry.depth + 1) {
                    Offer::Enqueued | Offer::Duplicate => {}
                    Offer::TooDeep => stats.links_too_deep += 1,
                }
            }
        };

        info!(
            "Crawl finished ({}): {} pages in {:?}, {} queued",
            termination,
            pages.len(),
            start_time.elapsed(),
            frontier.len()
        );

        let recorded_dir = std::fs::canonicalize(site_dir).unwrap_or_else(|_| site_dir.to_path_buf());
        let manifest = CrawlManifest::build(
            seed,
            self.settings.max_pages,
            self.settings.max_depth,
            &recorded_dir,
            &pages,
            stats,
            termination,
        );
        let manifest_path = write_manifest(&manifest, site_dir)?;

        Ok(CrawlOutcome {
            manifest,
            manifest_path,
        })
    }

    /// Fetches a page under the hard timeout and extracts it
    async fn fetch_page(&mut self, url: &Url) -> Result<ExtractedPage, HarvestError> {
        let timeout = self.settings.fetch_timeout;

        let fetched = match tokio::time::timeout(timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(source)) => {
                return Err(HarvestError::Fetch {
                    url: url.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(HarvestError::Fetch {
                    url: url.to_string(),
                    source: FetchError::Timeout {
                        secs: timeout.as_secs(),
                    },
                })
            }
        };

        extract(&fetched.html, url, &fetched.final_url).map_err(|source| HarvestError::Extraction {
            url: url.to_string(),
            source,
        })
    }
}
