//! Pipeline orchestrator
//!
//! Runs the crawl stage, reads the manifest it wrote, and only then runs the
//! transform stage on the manifest's site directory. Stage output is
//! observability only; control decisions come from exit codes and the
//! manifest file.

use crate::output::{manifest_path, read_manifest, CrawlManifest};
use crate::pipeline::stage::{run_stage, StageCommand, StageError};
use crate::pipeline::{LogSink, StageKind};
use crate::state::StageStatus;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Placeholder in the transform command replaced by the site directory
pub const SITE_DIR_PLACEHOLDER: &str = "{site_dir}";

/// State and captured output of one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub status: StageStatus,
    pub log: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl StageRecord {
    fn transition(&mut self, stage: StageKind, next: StageStatus) -> Result<(), StageError> {
        if !self.status.can_transition_to(next) {
            return Err(StageError::InvalidTransition {
                stage,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    fn fail(&mut self, stage: StageKind, reason: String) -> Result<(), StageError> {
        warn!("{} stage failed: {}", stage, reason);
        self.error = Some(reason);
        self.transition(stage, StageStatus::Failed)
    }
}

/// One pipeline invocation
///
/// Passed into and returned from each orchestration call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineRun {
    pub crawl: StageRecord,
    pub transform: StageRecord,

    /// The crawl manifest, once it has been read
    pub manifest: Option<CrawlManifest>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, stage: StageKind) -> &StageRecord {
        match stage {
            StageKind::Crawl => &self.crawl,
            StageKind::Transform => &self.transform,
        }
    }

    fn stage_mut(&mut self, stage: StageKind) -> &mut StageRecord {
        match stage {
            StageKind::Crawl => &mut self.crawl,
            StageKind::Transform => &mut self.transform,
        }
    }

    /// Returns true when both stages succeeded
    pub fn is_success(&self) -> bool {
        self.crawl.status.is_success() && self.transform.status.is_success()
    }
}

/// Sequences the crawl and transform stages
#[derive(Debug, Clone)]
pub struct Orchestrator {
    crawl: StageCommand,
    site_dir: PathBuf,
    transform: StageCommand,
}

impl Orchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `crawl` - Command for the crawl stage; it must write its manifest into `site_dir`
    /// * `site_dir` - Where the crawl stage's manifest will be found
    /// * `transform` - Command for the transform stage; `{site_dir}` in its arguments is
    ///   replaced by the manifest's site directory (appended if absent)
    pub fn new(crawl: StageCommand, site_dir: impl Into<PathBuf>, transform: StageCommand) -> Self {
        Self {
            crawl,
            site_dir: site_dir.into(),
            transform,
        }
    }

    /// Runs the crawl stage and reads its manifest
    ///
    /// The stage succeeds only if the process exits 0 and leaves a readable
    /// manifest whose status is not `failed`. Stage failures are recorded in
    /// the returned run; only an illegal state transition is an error.
    pub async fn run_crawl(
        &self,
        mut run: PipelineRun,
        sink: &mut dyn LogSink,
    ) -> Result<PipelineRun, StageError> {
        let stage = StageKind::Crawl;
        run.crawl.transition(stage, StageStatus::Running)?;

        let exit = {
            let record = run.stage_mut(stage);
            run_stage(stage, &self.crawl, sink, &mut record.log).await
        };

        let status = match exit {
            Ok(status) => status,
            Err(e) => {
                run.crawl.fail(stage, e.to_string())?;
                return Ok(run);
            }
        };
        run.crawl.exit_code = status.code();

        // The manifest is read even after a failed exit, for reporting
        let path = manifest_path(&self.site_dir);
        match read_manifest(&path) {
            Ok(manifest) => run.manifest = Some(manifest),
            Err(source) => {
                let e = StageError::Manifest { path, source };
                run.crawl.fail(stage, e.to_string())?;
                return Ok(run);
            }
        }

        if !status.success() {
            run.crawl.fail(stage, format!("exited with {}", status))?;
            return Ok(run);
        }

        match run.manifest.as_ref().map(|m| m.status) {
            Some(crawl_status) if crawl_status.is_usable() => {
                info!("Crawl stage finished with status {}", crawl_status);
                run.crawl.transition(stage, StageStatus::Succeeded)?;
            }
            other => {
                let reason = match other {
                    Some(s) => format!("manifest status is {}", s),
                    None => "manifest missing".to_string(),
                };
                run.crawl.fail(stage, reason)?;
            }
        }

        Ok(run)
    }

    /// Runs the transform stage on the crawled site
    ///
    /// Requires a succeeded crawl stage with a manifest.
    pub async fn run_transform(
        &self,
        mut run: PipelineRun,
        sink: &mut dyn LogSink,
    ) -> Result<PipelineRun, StageError> {
        let stage = StageKind::Transform;

        if !run.crawl.status.is_success() {
            return Err(StageError::Blocked {
                stage,
                reason: format!("crawl stage is {}", run.crawl.status),
            });
        }
        let site_dir = match &run.manifest {
            Some(manifest) => manifest.site_dir().display().to_string(),
            None => {
                return Err(StageError::Blocked {
                    stage,
                    reason: "no crawl manifest".to_string(),
                })
            }
        };

        let command = self.transform.substitute(SITE_DIR_PLACEHOLDER, &site_dir);
        run.transform.transition(stage, StageStatus::Running)?;

        let exit = {
            let record = run.stage_mut(stage);
            run_stage(stage, &command, sink, &mut record.log).await
        };

        match exit {
            Ok(status) => {
                run.transform.exit_code = status.code();
                if status.success() {
                    run.transform.transition(stage, StageStatus::Succeeded)?;
                } else {
                    run.transform.fail(stage, format!("exited with {}", status))?;
                }
            }
            Err(e) => run.transform.fail(stage, e.to_string())?,
        }

        Ok(run)
    }

    /// Runs the whole pipeline
    ///
    /// The transform stage is skipped (left pending) when the crawl stage fails.
    pub async fn run(&self, sink: &mut dyn LogSink) -> Result<PipelineRun, StageError> {
        let run = self.run_crawl(PipelineRun::new(), sink).await?;

        if !run.crawl.status.is_success() {
            warn!("Skipping transform stage");
            return Ok(run);
        }

        self.run_transform(run, sink).await
    }
}
