//! State module for tracking crawl and pipeline progress
//!
//! # Components
//!
//! - `StageStatus`: lifecycle of a pipeline stage (pending, running, succeeded, failed)
//! - `CrawlStatus`: the manifest-level verdict of a crawl run
//! - `Termination`: why the frontier stopped

mod crawl_state;
mod stage_state;

// Re-export main types
pub use crawl_state::{CrawlStatus, Termination};
pub use stage_state::StageStatus;
