//! Storage traits and error types
//!
//! This module defines the trait interface for page stores and
//! associated error types.

use crate::storage::{PageRecord, StoredPage};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid directory name: {0}")]
    InvalidName(String),

    #[error("Failed to finalize page directory {path}: {source}")]
    Finalize {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page store implementations
///
/// A store owns one site directory and writes one folder per page into it.
/// A call to [`PageStore::store`] either leaves a complete page folder behind or
/// nothing at all.
pub trait PageStore {
    /// Persists one page record
    ///
    /// # Arguments
    ///
    /// * `record` - The extracted page content
    /// * `depth` - Link depth of the page from the seed
    ///
    /// # Returns
    ///
    /// The folder the page was written to
    fn store(&mut self, record: &PageRecord, depth: u32) -> StorageResult<StoredPage>;

    /// The site directory this store writes into
    fn site_dir(&self) -> &Path;

    /// Number of pages stored so far
    fn stored_count(&self) -> usize;
}
