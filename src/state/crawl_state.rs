use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall verdict of a crawl run, as written to the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    /// At least one page stored and no page was skipped
    Completed,
    /// At least one page stored, some pages skipped due to failures
    Partial,
    /// No page stored (seed rejected or unreachable)
    Failed,
}

impl CrawlStatus {
    /// Derives the status from page counts
    pub fn from_counts(pages_crawled: usize, pages_skipped: u64) -> Self {
        if pages_crawled == 0 {
            Self::Failed
        } else if pages_skipped > 0 {
            Self::Partial
        } else {
            Self::Completed
        }
    }

    /// Returns true if a transform stage may consume the run
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the crawl loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Page cap reached
    ExhaustedByCount,
    /// Queue emptied before the cap
    ExhaustedByFrontier,
    /// Queue emptied and some discovered links were beyond max depth
    ExhaustedByDepth,
    /// The seed URL failed the safety check
    SeedRejected,
    /// The seed URL could not be fetched or extracted
    SeedUnreachable,
}

impl Termination {
    /// Returns true for the abort paths that leave zero pages
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::SeedRejected | Self::SeedUnreachable)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExhaustedByCount => "exhausted by page count",
            Self::ExhaustedByFrontier => "frontier exhausted",
            Self::ExhaustedByDepth => "exhausted by depth",
            Self::SeedRejected => "seed rejected",
            Self::SeedUnreachable => "seed unreachable",
        };
        f.write_str(name)
    }
}
