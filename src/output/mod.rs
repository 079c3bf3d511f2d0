//! Output module for crawl results
//!
//! This module handles:
//! - Building and persisting the crawl manifest
//! - Reading a manifest back for the downstream stage
//! - Recording and printing crawl statistics

mod manifest;
pub mod stats;

pub use manifest::{
    manifest_path, read_manifest, write_manifest, CrawlInfo, CrawlManifest, ManifestError,
    ManifestPage, OutputInfo, MANIFEST_FILE_NAME, SCHEMA_VERSION,
};
pub use stats::{print_statistics, CrawlStatistics};
