//! site-harvest: a bounded, SSRF-aware site crawler
//!
//! This crate crawls a seed URL breadth-first to a bounded depth and page count, stores
//! one content record per page on disk, and writes a JSON manifest that a separate
//! transform stage consumes. A small orchestrator runs both stages as child processes.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod transform;
pub mod url;

use thiserror::Error;

/// Main error type for site-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsafe target {url}: {reason}")]
    UnsafeTarget {
        url: String,
        reason: crate::url::RejectReason,
    },

    #[error("Fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        source: crawler::FetchError,
    },

    #[error("Extraction failed for {url}: {source}")]
    Extraction {
        url: String,
        source: crawler::ExtractError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Manifest write failed: {0}")]
    ManifestWrite(#[from] output::ManifestError),

    #[error("Stage error: {0}")]
    Stage(#[from] pipeline::StageError),

    #[error("Transform error: {0}")]
    Transform(#[from] transform::TransformError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for site-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, CrawlOutcome};
pub use output::CrawlManifest;
pub use pipeline::{Orchestrator, PipelineRun};
pub use state::{CrawlStatus, StageStatus, Termination};
pub use crate::url::{normalize_url, SafetyValidator, SiteScope};
