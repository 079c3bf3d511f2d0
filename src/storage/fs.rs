//! Filesystem page store
//!
//! Each page is written into a hidden staging directory inside the site
//! directory and renamed into place once all artifacts are on disk.

use crate::output::MANIFEST_FILE_NAME;
use crate::storage::slug::folder_name;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{
    PageRecord, StoredPage, COPY_FILE, CSS_FILE, HTML_FILE, IMAGES_FILE, URL_FILE,
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Prefix for in-progress page directories
const STAGING_PREFIX: &str = ".staging-";

/// Names in the site directory that belong to the run, not to a page
const RESERVED_NAMES: [&str; 1] = [MANIFEST_FILE_NAME];

/// Page store writing one directory per page under a site directory
pub struct FsPageStore {
    site_dir: PathBuf,
    seed: Url,
    used: HashSet<String>,
}

impl FsPageStore {
    /// Creates a store for `site_dir`, which must already exist
    ///
    /// `seed` is the crawl's seed URL; its page is stored under `home`.
    pub fn new(site_dir: impl Into<PathBuf>, seed: Url) -> Self {
        Self {
            site_dir: site_dir.into(),
            seed,
            used: HashSet::new(),
        }
    }

    /// Picks a folder name not yet used by this store or present on disk
    fn unique_folder(&self, url: &Url) -> String {
        let base = folder_name(url, &self.seed);
        if !self.is_taken(&base) {
            return base;
        }

        let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
        let mut candidate = format!("{}-{}", base, &digest[..8]);
        let mut n = 1u32;
        while self.is_taken(&candidate) {
            candidate = format!("{}-{}-{}", base, &digest[..8], n);
            n += 1;
        }
        candidate
    }

    fn is_taken(&self, name: &str) -> bool {
        RESERVED_NAMES.contains(&name)
            || self.used.contains(name)
            || self.site_dir.join(name).exists()
    }
}

impl PageStore for FsPageStore {
    fn store(&mut self, record: &PageRecord, depth: u32) -> StorageResult<StoredPage> {
        let url = Url::parse(&record.url).map_err(|_| StorageError::InvalidUrl(record.url.clone()))?;
        let folder = self.unique_folder(&url);
        let target = self.site_dir.join(&folder);

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.site_dir)?;

        write_artifacts(staging.path(), record)?;

        // The staging guard is dropped after the rename; its cleanup then
        // finds nothing left to remove.
        fs::rename(staging.path(), &target).map_err(|source| StorageError::Finalize {
            path: target.display().to_string(),
            source,
        })?;
        drop(staging);

        self.used.insert(folder.clone());
        tracing::debug!(url = %record.url, folder = %folder, "Stored page");

        Ok(StoredPage {
            url: record.url.clone(),
            folder,
            depth,
            path: target,
        })
    }

    fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    fn stored_count(&self) -> usize {
        self.used.len()
    }
}

/// Writes all five page artifacts into `dir`
fn write_artifacts(dir: &Path, record: &PageRecord) -> StorageResult<()> {
    fs::write(dir.join(URL_FILE), &record.url)?;
    fs::write(dir.join(HTML_FILE), &record.html)?;
    fs::write(dir.join(COPY_FILE), &record.text)?;
    fs::write(dir.join(IMAGES_FILE), lines(record.images.iter()))?;
    fs::write(dir.join(CSS_FILE), css_contents(record))?;
    Ok(())
}

fn lines<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(item);
        out.push('\n');
    }
    out
}

/// Renders `css.txt`: stylesheet URLs, then inline style blocks when present
fn css_contents(record: &PageRecord) -> String {
    let mut out = lines(record.css_refs.iter());
    if !record.inline_styles.is_empty() {
        out.push_str("\n\n/* Inline Styles */\n");
        for style in &record.inline_styles {
            out.push_str(style);
            out.push('\n');
        }
    }
    out
}
