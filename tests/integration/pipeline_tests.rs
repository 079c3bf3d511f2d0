//! Integration tests for the pipeline orchestrator
//!
//! Stages are small shell scripts that mimic the crawl and transform
//! binaries: the crawl script writes a manifest, the transform script echoes
//! the directory it was handed.

#![cfg(unix)]

use site_harvest::output::MANIFEST_FILE_NAME;
use site_harvest::pipeline::{
    MemorySink, Orchestrator, StageCommand, StageKind, StreamKind, SITE_DIR_PLACEHOLDER,
};
use site_harvest::state::{CrawlStatus, StageStatus};
use std::path::Path;
use tempfile::TempDir;

fn manifest_json(site_dir: &Path, status: &str, pages: &[&str]) -> String {
    serde_json::json!({
        "schemaVersion": 1,
        "timestamp": "2025-01-01T00:00:00Z",
        "crawl_info": {
            "target_url": "https://example.com/",
            "base_netloc": "example.com",
            "max_pages": 20,
            "crawl_depth": 2,
            "pages_crawled": pages.len(),
        },
        "output": {
            "site_dir": site_dir,
            "crawled_pages": pages,
        },
        "status": status,
    })
    .to_string()
}

/// A crawl stage that writes `manifest` into `site_dir` and exits with `code`
fn crawl_script(site_dir: &Path, manifest: Option<String>, code: i32) -> StageCommand {
    let write = match manifest {
        Some(json) => format!(
            "printf '%s' '{}' > \"$0/{}\"; ",
            json, MANIFEST_FILE_NAME
        ),
        None => String::new(),
    };
    StageCommand::new("sh")
        .arg("-c")
        .arg(format!(
            "echo crawling; echo 'fetch warning' >&2; {}exit {}",
            write, code
        ))
        .arg(site_dir.display().to_string())
}

fn transform_script(code: i32) -> StageCommand {
    StageCommand::new("sh")
        .arg("-c")
        .arg(format!("echo \"transforming $0\"; exit {}", code))
        .arg(SITE_DIR_PLACEHOLDER)
}

#[tokio::test]
async fn test_completed_crawl_runs_transform() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(dir.path(), "completed", &["https://example.com/"]);
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 0),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert!(run.is_success());
    assert_eq!(run.crawl.status, StageStatus::Succeeded);
    assert_eq!(run.transform.status, StageStatus::Succeeded);
    assert_eq!(
        run.manifest.as_ref().map(|m| m.status),
        Some(CrawlStatus::Completed)
    );

    let expected = format!("transforming {}", dir.path().display());
    assert_eq!(sink.stage_lines(StageKind::Transform), vec![expected.as_str()]);
    assert!(run.transform.log.contains(&expected));
}

#[tokio::test]
async fn test_crawl_output_streamed_and_logged() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(dir.path(), "completed", &["https://example.com/"]);
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 0),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert!(sink
        .lines
        .contains(&(StageKind::Crawl, StreamKind::Stdout, "crawling".to_string())));
    assert!(sink
        .lines
        .contains(&(StageKind::Crawl, StreamKind::Stderr, "fetch warning".to_string())));
    assert!(run.crawl.log.contains("crawling"));
    assert!(run.crawl.log.contains("fetch warning"));
}

#[tokio::test]
async fn test_partial_crawl_still_transforms() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(
        dir.path(),
        "partial",
        &["https://example.com/", "https://example.com/about"],
    );
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 0),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert_eq!(run.crawl.status, StageStatus::Succeeded);
    assert_eq!(run.transform.status, StageStatus::Succeeded);
}

#[tokio::test]
async fn test_failed_crawl_skips_transform() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(dir.path(), "failed", &[]);
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 1),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert_eq!(run.crawl.status, StageStatus::Failed);
    assert_eq!(run.crawl.exit_code, Some(1));
    assert_eq!(run.transform.status, StageStatus::Pending);
    assert!(sink.stage_lines(StageKind::Transform).is_empty());
    assert_eq!(
        run.manifest.as_ref().map(|m| m.status),
        Some(CrawlStatus::Failed)
    );
}

#[tokio::test]
async fn test_failed_manifest_with_zero_exit_is_failure() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(dir.path(), "failed", &[]);
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 0),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert_eq!(run.crawl.status, StageStatus::Failed);
    assert_eq!(run.transform.status, StageStatus::Pending);
}

#[tokio::test]
async fn test_missing_manifest_is_failure() {
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), None, 0),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert_eq!(run.crawl.status, StageStatus::Failed);
    assert!(run.crawl.error.is_some());
    assert!(run.manifest.is_none());
    assert_eq!(run.transform.status, StageStatus::Pending);
}

#[tokio::test]
async fn test_transform_failure_reported() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(dir.path(), "completed", &["https://example.com/"]);
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 0),
        dir.path(),
        transform_script(3),
    );
    let mut sink = MemorySink::new();

    let run = orchestrator.run(&mut sink).await.unwrap();

    assert_eq!(run.crawl.status, StageStatus::Succeeded);
    assert_eq!(run.transform.status, StageStatus::Failed);
    assert_eq!(run.transform.exit_code, Some(3));
    assert!(!run.is_success());
}

#[tokio::test]
async fn test_stages_run_one_at_a_time() {
    let dir = TempDir::new().unwrap();
    let manifest = manifest_json(dir.path(), "completed", &["https://example.com/"]);
    let orchestrator = Orchestrator::new(
        crawl_script(dir.path(), Some(manifest), 0),
        dir.path(),
        transform_script(0),
    );
    let mut sink = MemorySink::new();

    orchestrator.run(&mut sink).await.unwrap();

    let first_transform = sink
        .lines
        .iter()
        .position(|(s, _, _)| *s == StageKind::Transform)
        .unwrap();
    assert!(sink.lines[..first_transform]
        .iter()
        .all(|(s, _, _)| *s == StageKind::Crawl));
    assert!(sink.lines[first_transform..]
        .iter()
        .all(|(s, _, _)| *s == StageKind::Transform));
}
