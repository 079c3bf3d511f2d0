//! Integration tests for the crawler
//!
//! These tests drive a full crawl run against an in-memory site. Hosts are
//! resolved through a static table, so no test touches the network.

use async_trait::async_trait;
use site_harvest::config::{Config, OriginScope};
use site_harvest::crawler::{
    parse_seed, run_crawl, CrawlSettings, Crawler, FetchError, FetchedPage, PageFetcher,
};
use site_harvest::output::{read_manifest, MANIFEST_FILE_NAME};
use site_harvest::state::{CrawlStatus, Termination};
use site_harvest::url::{normalize_url, SafetyValidator, StaticResolver};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// Serves a fixed site and records every requested URL
struct SiteFetcher {
    pages: HashMap<String, String>,
    slow: HashSet<String>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PageFetcher for SiteFetcher {
    async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        if self.slow.contains(url.as_str()) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        match self.pages.get(url.as_str()) {
            Some(html) => Ok(FetchedPage {
                final_url: url.clone(),
                html: html.clone(),
            }),
            None => Err(FetchError::Navigation(format!("404 for {}", url))),
        }
    }

    async fn close(&mut self) {}
}

struct TestSite {
    pages: Vec<(String, String)>,
    slow: Vec<String>,
}

impl TestSite {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            slow: Vec::new(),
        }
    }

    fn page(mut self, path: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
            .collect();
        let html = format!(
            "<html><head><title>{}</title></head><body><p>Page {}</p>{}</body></html>",
            path, path, anchors
        );
        self.pages.push((format!("https://example.com{}", path), html));
        self
    }

    fn slow(mut self, path: &str) -> Self {
        self.slow.push(format!("https://example.com{}", path));
        self
    }
}

fn validator() -> SafetyValidator {
    let resolver = StaticResolver::new()
        .with_host(
            "example.com",
            &[IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))],
        )
        .with_host(
            "intranet.example.com",
            &[IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5))],
        );
    SafetyValidator::new(Arc::new(resolver))
}

fn settings(max_pages: u32, max_depth: u32) -> CrawlSettings {
    CrawlSettings {
        max_pages,
        max_depth,
        fetch_timeout: Duration::from_millis(100),
        origin_scope: OriginScope::Host,
    }
}

fn crawler(site: &TestSite, settings: CrawlSettings) -> (Crawler, Arc<Mutex<Vec<String>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let fetcher = SiteFetcher {
        pages: site.pages.iter().cloned().collect(),
        slow: site.slow.iter().cloned().collect(),
        requests: requests.clone(),
    };
    (
        Crawler::new(settings, validator(), Box::new(fetcher)),
        requests,
    )
}

fn page_dirs(site_dir: &Path) -> Vec<String> {
    let mut dirs: Vec<String> = std::fs::read_dir(site_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    dirs.sort();
    dirs
}

/// A small tree: / -> a, b; a -> c; b -> d; c -> e
fn tree_site() -> TestSite {
    TestSite::new()
        .page("/", &["/a", "/b"])
        .page("/a", &["/c", "/"])
        .page("/b", &["/d", "/a#top"])
        .page("/c", &["/e"])
        .page("/d", &[])
        .page("/e", &[])
}

#[tokio::test]
async fn test_single_page_budget() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, _) = crawler(&tree_site(), settings(1, 2));
    let seed = normalize_url("https://example.com").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();
    let manifest = read_manifest(&outcome.manifest_path).unwrap();

    assert_eq!(manifest.crawl_info.pages_crawled, 1);
    assert_eq!(manifest.output.crawled_pages, vec!["https://example.com/"]);
    assert_eq!(manifest.status, CrawlStatus::Completed);
    assert_eq!(manifest.termination, Some(Termination::ExhaustedByCount));
    assert_eq!(manifest.crawl_info.target_url, "https://example.com/");
    assert_eq!(manifest.crawl_info.base_netloc, "example.com");
}

#[tokio::test]
async fn test_private_seed_rejected_before_fetch() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, requests) = crawler(&TestSite::new(), settings(20, 2));
    let seed = normalize_url("https://intranet.example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(outcome.status(), CrawlStatus::Failed);
    assert_eq!(outcome.termination(), Some(Termination::SeedRejected));
    assert_eq!(outcome.manifest.crawl_info.pages_crawled, 0);
    assert!(requests.lock().unwrap().is_empty());
    assert!(page_dirs(dir.path()).is_empty());
    assert!(outcome.manifest_path.is_file());
}

#[tokio::test]
async fn test_private_ip_literal_rejected() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, requests) = crawler(&TestSite::new(), settings(20, 2));

    for seed in ["http://127.0.0.1/", "http://10.1.2.3/", "http://172.16.0.1/"] {
        let seed = normalize_url(seed).unwrap();
        let outcome = crawler.run(&seed, dir.path()).await.unwrap();
        assert_eq!(outcome.termination(), Some(Termination::SeedRejected));
    }
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_timeouts_yield_partial() {
    let dir = TempDir::new().unwrap();
    let mut site = TestSite::new().page("/", &["/s1", "/s2", "/s3", "/s4", "/s5"]);
    for i in 1..=5 {
        let path = format!("/s{}", i);
        site = site.page(&path, &[]).slow(&path);
    }
    let (mut crawler, _) = crawler(&site, settings(20, 2));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(outcome.status(), CrawlStatus::Partial);
    assert_eq!(outcome.manifest.crawl_info.pages_crawled, 1);
    assert_eq!(outcome.manifest.stats.pages_failed, 5);
    assert_eq!(page_dirs(dir.path()), vec!["home"]);
}

#[tokio::test]
async fn test_breadth_first_order() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, requests) = crawler(&tree_site(), settings(20, 2));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(
        outcome.manifest.output.crawled_pages,
        vec![
            "https://example.com/",
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c",
            "https://example.com/d",
        ]
    );
    assert_eq!(requests.lock().unwrap().len(), 5);

    let depths: Vec<u32> = outcome.manifest.output.pages.iter().map(|p| p.depth).collect();
    assert!(depths.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_depth_bound() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, _) = crawler(&tree_site(), settings(20, 2));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();
    let manifest = &outcome.manifest;

    assert!(manifest.output.pages.iter().all(|p| p.depth <= 2));
    assert!(!manifest
        .output
        .crawled_pages
        .contains(&"https://example.com/e".to_string()));
    assert_eq!(manifest.stats.links_too_deep, 1);
    assert_eq!(manifest.termination, Some(Termination::ExhaustedByDepth));
    assert_eq!(manifest.status, CrawlStatus::Completed);
}

#[tokio::test]
async fn test_depth_zero_stores_seed_only() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, requests) = crawler(&tree_site(), settings(20, 0));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(outcome.manifest.crawl_info.pages_crawled, 1);
    assert_eq!(requests.lock().unwrap().len(), 1);
    assert_eq!(outcome.termination(), Some(Termination::ExhaustedByDepth));
}

#[tokio::test]
async fn test_no_duplicate_pages() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new()
        .page("/", &["/a", "/a/", "/a#x", "/./a", "https://EXAMPLE.com/a", "/a?p=1"])
        .page("/a", &["/", "/a"])
        .page("/a?p=1", &["/a"]);
    let (mut crawler, requests) = crawler(&site, settings(20, 3));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();
    let crawled = &outcome.manifest.output.crawled_pages;

    let unique: HashSet<&String> = crawled.iter().collect();
    assert_eq!(unique.len(), crawled.len());
    assert_eq!(
        crawled,
        &vec![
            "https://example.com/".to_string(),
            "https://example.com/a".to_string(),
            "https://example.com/a?p=1".to_string(),
        ]
    );
    assert_eq!(requests.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_page_cap_respected() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, _) = crawler(&tree_site(), settings(3, 5));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(outcome.manifest.crawl_info.pages_crawled, 3);
    assert_eq!(outcome.termination(), Some(Termination::ExhaustedByCount));
    assert!(outcome.manifest.validate().is_ok());
}

#[tokio::test]
async fn test_crawl_is_deterministic() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let seed = normalize_url("https://example.com/").unwrap();

    let (mut first, _) = crawler(&tree_site(), settings(20, 2));
    let (mut second, _) = crawler(&tree_site(), settings(20, 2));

    let a = first.run(&seed, first_dir.path()).await.unwrap();
    let b = second.run(&seed, second_dir.path()).await.unwrap();

    assert_eq!(a.manifest.output.crawled_pages, b.manifest.output.crawled_pages);
    assert_eq!(page_dirs(first_dir.path()), page_dirs(second_dir.path()));
}

#[tokio::test]
async fn test_page_artifacts_written() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, _) = crawler(&tree_site(), settings(2, 2));
    let seed = normalize_url("https://example.com/").unwrap();

    crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(page_dirs(dir.path()), vec!["a", "home"]);
    let home = dir.path().join("home");
    for name in ["url.txt", "page.html", "copy.txt", "images.txt", "css.txt"] {
        assert!(home.join(name).is_file(), "missing {}", name);
    }
    assert_eq!(
        std::fs::read_to_string(home.join("url.txt")).unwrap(),
        "https://example.com/"
    );
    assert!(std::fs::read_to_string(home.join("copy.txt"))
        .unwrap()
        .contains("Page /"));
}

#[tokio::test]
async fn test_manifest_name_link_keeps_manifest() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new()
        .page("/", &["/crawl_manifest.json"])
        .page("/crawl_manifest.json", &[]);
    let (mut crawler, _) = crawler(&site, settings(20, 2));
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert!(outcome.manifest_path.is_file());
    let manifest = read_manifest(&outcome.manifest_path).unwrap();
    assert_eq!(manifest.status, CrawlStatus::Completed);
    assert_eq!(manifest.crawl_info.pages_crawled, 2);
    assert!(!page_dirs(dir.path()).contains(&MANIFEST_FILE_NAME.to_string()));
}

#[tokio::test]
async fn test_private_link_rejected_mid_crawl() {
    let dir = TempDir::new().unwrap();
    let site = TestSite::new()
        .page("/", &["/about", "https://intranet.example.com/"])
        .page("/about", &[]);
    let settings = CrawlSettings {
        origin_scope: OriginScope::Subdomains,
        ..settings(20, 2)
    };
    let (mut crawler, requests) = crawler(&site, settings);
    let seed = normalize_url("https://example.com/").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert!(!requests
        .lock()
        .unwrap()
        .contains(&"https://intranet.example.com/".to_string()));
    assert_eq!(outcome.manifest.stats.pages_rejected, 1);
    assert_eq!(outcome.manifest.crawl_info.pages_crawled, 2);
    assert_eq!(outcome.status(), CrawlStatus::Partial);
}

#[tokio::test]
async fn test_non_http_seed_rejected_with_manifest() {
    let dir = TempDir::new().unwrap();
    let (mut crawler, requests) = crawler(&tree_site(), settings(20, 2));
    let seed = parse_seed("ftp://example.com/files").unwrap();

    let outcome = crawler.run(&seed, dir.path()).await.unwrap();

    assert_eq!(outcome.status(), CrawlStatus::Failed);
    assert_eq!(outcome.termination(), Some(Termination::SeedRejected));
    assert!(requests.lock().unwrap().is_empty());
    assert!(outcome.manifest_path.is_file());
}

#[tokio::test]
async fn test_run_crawl_non_http_seed_writes_failed_manifest() {
    let dir = TempDir::new().unwrap();
    let site_dir = dir.path().join("site");

    let outcome = run_crawl(&Config::default(), "ftp://example.com/files", Some(site_dir.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.status(), CrawlStatus::Failed);
    assert_eq!(outcome.termination(), Some(Termination::SeedRejected));
    assert_eq!(outcome.manifest_path, site_dir.join(MANIFEST_FILE_NAME));
    assert!(outcome.manifest_path.is_file());
}

#[test]
fn test_parse_seed() {
    assert_eq!(
        parse_seed("https://example.com").unwrap().as_str(),
        "https://example.com/"
    );
    assert_eq!(parse_seed("ftp://example.com/x").unwrap().scheme(), "ftp");
    assert!(parse_seed("mailto:someone").is_err());
}
