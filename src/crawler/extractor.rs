//! HTML content extraction
//!
//! This module turns a fetched page into a [`PageRecord`]:
//! - Image and stylesheet URLs (absolute, deduplicated)
//! - Inline `<style>` blocks
//! - Visible text, one line per text node
//! - Outbound links to feed the frontier

use crate::storage::PageRecord;
use scraper::{Html, Node, Selector};
use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

/// Largest document the extractor will parse (10 MiB)
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Errors raised while extracting a page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Extracted content plus the links found on the page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub record: PageRecord,

    /// Absolute HTTP(S) links in document order (may repeat)
    pub links: Vec<Url>,
}

/// Extracts content and links from an HTML document
///
/// `page_url` is recorded in the [`PageRecord`]; `base_url` is what relative
/// references resolve against (the final URL after redirects).
///
/// # Example
///
/// ```
/// use site_harvest::crawler::extract;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let page = extract("<p>Hi</p><a href='/about'>About</a>", &base, &base).unwrap();
/// assert_eq!(page.record.text, "Hi\nAbout");
/// assert_eq!(page.links[0].as_str(), "https://example.com/about");
/// ```
pub fn extract(html: &str, page_url: &Url, base_url: &Url) -> Result<ExtractedPage, ExtractError> {
    if html.len() > MAX_DOCUMENT_BYTES {
        return Err(ExtractError::TooLarge {
            size: html.len(),
            limit: MAX_DOCUMENT_BYTES,
        });
    }

    let document = Html::parse_document(html);

    let record = PageRecord {
        url: page_url.to_string(),
        html: html.to_string(),
        text: visible_text(&document),
        images: collect_urls(&document, "img[src]", "src", base_url),
        css_refs: collect_urls(&document, r#"link[rel~="stylesheet"][href]"#, "href", base_url),
        inline_styles: inline_styles(&document),
    };

    Ok(ExtractedPage {
        record,
        links: extract_links(&document, base_url),
    })
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Resolves an attribute of every matching element to an absolute URL
fn collect_urls(document: &Html, css: &str, attr: &str, base_url: &Url) -> BTreeSet<String> {
    let Some(sel) = selector(css) else {
        return BTreeSet::new();
    };

    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter_map(|v| base_url.join(v).ok())
        .map(|u| u.to_string())
        .collect()
}

fn inline_styles(document: &Html) -> Vec<String> {
    let Some(sel) = selector("style") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .map(|el| el.text().collect::<String>())
        .filter(|css| !css.trim().is_empty())
        .collect()
}

/// Collects visible text in document order, one trimmed line per text node
fn visible_text(document: &Html) -> String {
    let mut lines = Vec::new();
    let mut stack = vec![*document.root_element()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()) => {}
            _ => stack.extend(node.children().rev()),
        }
    }

    lines.join("\n")
}

/// Extracts all followable links from `<a href>` elements
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}
