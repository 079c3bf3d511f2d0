//! Storage module for persisting crawled pages
//!
//! This module handles everything written under a site directory, except the manifest:
//! - Allocating the per-site output directory
//! - Naming one folder per page
//! - Writing the five page artifacts all-or-nothing

mod fs;
mod slug;
mod traits;

pub use fs::FsPageStore;
pub use slug::folder_name;
pub use traits::{PageStore, StorageError, StorageResult};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Artifact holding the page URL
pub const URL_FILE: &str = "url.txt";
/// Artifact holding the raw (rendered) HTML
pub const HTML_FILE: &str = "page.html";
/// Artifact holding the extracted visible text
pub const COPY_FILE: &str = "copy.txt";
/// Artifact listing image URLs, one per line
pub const IMAGES_FILE: &str = "images.txt";
/// Artifact listing stylesheet URLs, followed by inline style blocks
pub const CSS_FILE: &str = "css.txt";

/// All page artifacts, in write order
pub const PAGE_ARTIFACTS: [&str; 5] = [URL_FILE, HTML_FILE, COPY_FILE, IMAGES_FILE, CSS_FILE];

/// Content extracted from one successfully fetched page
///
/// Immutable once built by the extractor; consumed by a [`PageStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub html: String,
    pub text: String,
    pub images: BTreeSet<String>,
    pub css_refs: BTreeSet<String>,
    pub inline_styles: Vec<String>,
}

/// A page that was written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub url: String,
    pub folder: String,
    pub depth: u32,
    pub path: PathBuf,
}

/// Allocates a fresh site directory under `base_dir`
///
/// The directory is named after the netloc with `:` replaced by `_`. If that
/// name exists, `_1`, `_2`, ... are tried in order. The directory is created
/// before returning, so two concurrent crawls never share one.
///
/// # Example
///
/// ```no_run
/// use site_harvest::storage::allocate_site_dir;
/// use std::path::Path;
///
/// let dir = allocate_site_dir(Path::new("."), "example.com:8080").unwrap();
/// assert!(dir.ends_with("example.com_8080"));
/// ```
pub fn allocate_site_dir(base_dir: &Path, netloc: &str) -> StorageResult<PathBuf> {
    std::fs::create_dir_all(base_dir)?;

    let stem = netloc.replace(':', "_");
    if stem.is_empty() || stem.starts_with('.') {
        return Err(StorageError::InvalidName(netloc.to_string()));
    }

    let mut count = 0u32;
    loop {
        let name = if count == 0 {
            stem.clone()
        } else {
            format!("{}_{}", stem, count)
        };
        let candidate = base_dir.join(&name);

        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => count += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
