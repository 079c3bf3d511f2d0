//! Transform stage: regenerate crawled pages with a text model
//!
//! Reads the pages of a crawled site directory and writes a sibling
//! `<site_dir>_ai/` directory with one `index.html` per page plus copies of
//! the original artifacts.

mod gemini;
mod prompt;

pub use gemini::{load_api_key, strip_code_fences, GeminiGenerator, Generator, API_KEY_VAR, ENV_FILE};
pub use prompt::{build_prompt, PageInputs};

use crate::output::{manifest_path, read_manifest, ManifestError};
use crate::storage::{COPY_FILE, CSS_FILE, HTML_FILE, IMAGES_FILE, PAGE_ARTIFACTS};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Name of the generated page inside each output folder
pub const OUTPUT_PAGE: &str = "index.html";

/// Errors raised by the transform stage
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("GOOGLE_GEMINI_API_KEY is not set in the environment or .env.local")]
    MissingApiKey,

    #[error("Site directory not found: {}", .0.display())]
    SiteNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Generation returned no text")]
    EmptyResponse,

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// What happened to each page of a transformed site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub output_dir: PathBuf,

    /// Folders whose page was regenerated
    pub generated: Vec<String>,

    /// Folders that kept their original HTML because generation failed
    pub fallback: Vec<String>,

    /// Folders skipped for missing inputs
    pub skipped: Vec<String>,
}

enum PageResult {
    Generated,
    Fallback,
    Skipped,
}

/// Returns the output directory for a site directory (`<site_dir>_ai`)
pub fn output_dir_for(site_dir: &Path) -> PathBuf {
    let raw = site_dir.to_string_lossy();
    let trimmed = raw.trim_end_matches(|c| c == '/' || c == '\\');
    PathBuf::from(format!("{}_ai", trimmed))
}

/// Lists the page folders of a site directory
///
/// Uses the manifest's page list when present; otherwise every visible
/// subdirectory, sorted by name.
pub fn page_folders(site_dir: &Path) -> Result<Vec<String>, TransformError> {
    let manifest_file = manifest_path(site_dir);
    if manifest_file.is_file() {
        let manifest = read_manifest(&manifest_file)?;
        if !manifest.output.pages.is_empty() {
            return Ok(manifest
                .output
                .pages
                .into_iter()
                .map(|p| p.folder)
                .collect());
        }
    }

    let mut folders = Vec::new();
    for entry in fs::read_dir(site_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with('.') {
            folders.push(name);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Transforms every page of a crawled site
///
/// # Arguments
///
/// * `site_dir` - The crawled site directory
/// * `generator` - The text model used to regenerate each page
///
/// # Returns
///
/// * `Ok(TransformReport)` - Every page was generated, fell back, or was skipped
/// * `Err(TransformError)` - The site could not be read or the output could not be written
pub async fn transform_site(
    site_dir: &Path,
    generator: &dyn Generator,
) -> Result<TransformReport, TransformError> {
    if !site_dir.is_dir() {
        return Err(TransformError::SiteNotFound(site_dir.to_path_buf()));
    }

    let output_dir = output_dir_for(site_dir);
    if output_dir.exists() {
        warn!(
            "Output folder {} exists, will overwrite enhanced pages",
            output_dir.display()
        );
    }
    fs::create_dir_all(&output_dir)?;

    let mut report = TransformReport {
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    for folder in page_folders(site_dir)? {
        let page_dir = site_dir.join(&folder);
        let out_page_dir = output_dir.join(&folder);

        match transform_page(&page_dir, &out_page_dir, generator).await? {
            PageResult::Generated => report.generated.push(folder),
            PageResult::Fallback => report.fallback.push(folder),
            PageResult::Skipped => report.skipped.push(folder),
        }
    }

    info!(
        "Enhanced site saved in {} ({} generated, {} kept original, {} skipped)",
        output_dir.display(),
        report.generated.len(),
        report.fallback.len(),
        report.skipped.len()
    );

    Ok(report)
}

fn read_optional(path: &Path) -> Result<String, TransformError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

async fn transform_page(
    page_dir: &Path,
    out_page_dir: &Path,
    generator: &dyn Generator,
) -> Result<PageResult, TransformError> {
    let copy_path = page_dir.join(COPY_FILE);
    let html_path = page_dir.join(HTML_FILE);

    if !copy_path.is_file() || !html_path.is_file() {
        warn!(
            "Missing {} or {} in {}, skipping",
            COPY_FILE,
            HTML_FILE,
            page_dir.display()
        );
        return Ok(PageResult::Skipped);
    }

    let inputs = PageInputs {
        copy: fs::read_to_string(&copy_path)?,
        css: read_optional(&page_dir.join(CSS_FILE))?,
        html: fs::read_to_string(&html_path)?,
        images: read_optional(&page_dir.join(IMAGES_FILE))?,
    };

    info!("Sending page context to the model for {}", page_dir.display());
    let prompt = build_prompt(&inputs);

    let (html, result) = match generator.generate(&prompt).await {
        Ok(text) if !text.trim().is_empty() => (text, PageResult::Generated),
        Ok(_) => {
            warn!("Empty generation for {}, keeping original HTML", page_dir.display());
            (inputs.html, PageResult::Fallback)
        }
        Err(e) => {
            warn!(
                "Generation failed for {}: {}, keeping original HTML",
                page_dir.display(),
                e
            );
            (inputs.html, PageResult::Fallback)
        }
    };

    fs::create_dir_all(out_page_dir)?;
    fs::write(out_page_dir.join(OUTPUT_PAGE), html)?;

    for name in PAGE_ARTIFACTS {
        let src = page_dir.join(name);
        if src.is_file() {
            fs::copy(&src, out_page_dir.join(name))?;
        }
    }

    info!(
        "Enhanced page saved to {}",
        out_page_dir.join(OUTPUT_PAGE).display()
    );
    Ok(result)
}
