//! Two-stage pipeline: crawl, then transform
//!
//! Each stage runs as a child process. The stages share only the filesystem,
//! and the crawl manifest is the handoff between them.

mod orchestrator;
mod sink;
mod stage;

pub use orchestrator::{Orchestrator, PipelineRun, StageRecord, SITE_DIR_PLACEHOLDER};
pub use sink::{ConsoleSink, LogSink, MemorySink};
pub use stage::{run_stage, StageCommand, StageError};

use serde::Serialize;
use std::fmt;

/// The pipeline's stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Crawl,
    Transform,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawl => f.write_str("crawl"),
            Self::Transform => f.write_str("transform"),
        }
    }
}

/// Which output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}
