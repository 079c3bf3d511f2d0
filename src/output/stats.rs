//! Crawl statistics
//!
//! Counters accumulated by the crawler during a run, embedded in the
//! manifest and printed at the end of a crawl.

use crate::output::CrawlManifest;
use serde::{Deserialize, Serialize};

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlStatistics {
    /// Pages whose fetch, extraction, or write failed
    pub pages_failed: u64,

    /// Pages refused by the safety validator
    pub pages_rejected: u64,

    /// Links found on stored pages (before any filtering)
    pub links_discovered: u64,

    /// Links dropped because they left the site scope
    pub links_out_of_scope: u64,

    /// Links dropped because they exceeded the depth bound
    pub links_too_deep: u64,
}

impl CrawlStatistics {
    /// Pages that were dequeued but not stored
    pub fn pages_skipped(&self) -> u64 {
        self.pages_failed + self.pages_rejected
    }
}

/// Prints a crawl summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `manifest` - The manifest of the finished run
pub fn print_statistics(manifest: &CrawlManifest) {
    let info = &manifest.crawl_info;
    let stats = &manifest.stats;

    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Target: {}", info.target_url);
    println!("  Site directory: {}", manifest.output.site_dir.display());
    println!(
        "  Pages crawled: {} (limit {}, depth {})",
        info.pages_crawled, info.max_pages, info.crawl_depth
    );
    println!();

    println!("Pages Skipped:");
    println!("  Failed: {}", stats.pages_failed);
    println!("  Rejected: {}", stats.pages_rejected);
    println!();

    println!("Links:");
    println!("  Discovered: {}", stats.links_discovered);
    println!("  Out of scope: {}", stats.links_out_of_scope);
    println!("  Beyond depth: {}", stats.links_too_deep);
    println!();

    if let Some(termination) = manifest.termination {
        println!("Stopped: {}", termination);
    }
    println!("Status: {}", manifest.status);
}
