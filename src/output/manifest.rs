//! Crawl manifest
//!
//! The manifest is the only contract between the crawl stage and the
//! transform stage. It is written once per run, atomically, to
//! `<site_dir>/crawl_manifest.json`.

use crate::output::CrawlStatistics;
use crate::state::{CrawlStatus, Termination};
use crate::storage::StoredPage;
use crate::url::netloc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// File name of the manifest inside the site directory
pub const MANIFEST_FILE_NAME: &str = "crawl_manifest.json";

/// Current manifest schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Errors reading or writing a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

/// Final state of a crawl run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlManifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    pub timestamp: DateTime<Utc>,

    pub crawl_info: CrawlInfo,

    pub output: OutputInfo,

    #[serde(default)]
    pub stats: CrawlStatistics,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,

    pub status: CrawlStatus,
}

/// Crawl parameters and headline count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlInfo {
    pub target_url: String,
    pub base_netloc: String,
    pub max_pages: u32,
    pub crawl_depth: u32,
    pub pages_crawled: usize,
}

/// Where the run's pages live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub site_dir: PathBuf,

    /// Stored page URLs in crawl order
    pub crawled_pages: Vec<String>,

    #[serde(default)]
    pub pages: Vec<ManifestPage>,
}

/// One stored page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPage {
    pub url: String,
    pub folder: String,
    pub depth: u32,
}

impl From<&StoredPage> for ManifestPage {
    fn from(page: &StoredPage) -> Self {
        Self {
            url: page.url.clone(),
            folder: page.folder.clone(),
            depth: page.depth,
        }
    }
}

impl CrawlManifest {
    /// Builds the manifest for a finished run
    ///
    /// The status is derived from the stored page count and the skipped page
    /// counters.
    pub fn build(
        seed: &Url,
        max_pages: u32,
        max_depth: u32,
        site_dir: &Path,
        pages: &[StoredPage],
        stats: CrawlStatistics,
        termination: Termination,
    ) -> Self {
        let status = CrawlStatus::from_counts(pages.len(), stats.pages_skipped());

        Self {
            schema_version: SCHEMA_VERSION,
            timestamp: Utc::now(),
            crawl_info: CrawlInfo {
                target_url: seed.to_string(),
                base_netloc: netloc(seed),
                max_pages,
                crawl_depth: max_depth,
                pages_crawled: pages.len(),
            },
            output: OutputInfo {
                site_dir: site_dir.to_path_buf(),
                crawled_pages: pages.iter().map(|p| p.url.clone()).collect(),
                pages: pages.iter().map(ManifestPage::from).collect(),
            },
            stats,
            termination: Some(termination),
            status,
        }
    }

    /// Checks the invariants a reader relies on
    pub fn validate(&self) -> Result<(), ManifestError> {
        let info = &self.crawl_info;
        let crawled = &self.output.crawled_pages;

        if info.pages_crawled != crawled.len() {
            return Err(ManifestError::Invalid(format!(
                "pages_crawled is {} but {} pages are listed",
                info.pages_crawled,
                crawled.len()
            )));
        }

        if info.pages_crawled > info.max_pages as usize {
            return Err(ManifestError::Invalid(format!(
                "pages_crawled {} exceeds max_pages {}",
                info.pages_crawled, info.max_pages
            )));
        }

        if let Some(page) = self.output.pages.iter().find(|p| p.depth > info.crawl_depth) {
            return Err(ManifestError::Invalid(format!(
                "page {} has depth {} beyond crawl_depth {}",
                page.url, page.depth, info.crawl_depth
            )));
        }

        Ok(())
    }

    /// Path of this run's site directory
    pub fn site_dir(&self) -> &Path {
        &self.output.site_dir
    }
}

/// Returns the manifest path for a site directory
pub fn manifest_path(site_dir: &Path) -> PathBuf {
    site_dir.join(MANIFEST_FILE_NAME)
}

/// Writes the manifest atomically into `site_dir`
///
/// The JSON is written to a temporary file in the same directory, synced,
/// and renamed over `crawl_manifest.json`.
pub fn write_manifest(manifest: &CrawlManifest, site_dir: &Path) -> Result<PathBuf, ManifestError> {
    let path = manifest_path(site_dir);
    let json = serde_json::to_vec_pretty(manifest)?;

    let mut file = tempfile::Builder::new()
        .prefix(".manifest-")
        .tempfile_in(site_dir)?;
    file.write_all(&json)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(&path).map_err(|e| ManifestError::Io(e.error))?;

    tracing::debug!(path = %path.display(), "Wrote manifest");
    Ok(path)
}

/// Reads and validates a manifest file
pub fn read_manifest(path: &Path) -> Result<CrawlManifest, ManifestError> {
    let contents = std::fs::read_to_string(path)?;
    let manifest: CrawlManifest = serde_json::from_str(&contents)?;
    manifest.validate()?;
    Ok(manifest)
}
