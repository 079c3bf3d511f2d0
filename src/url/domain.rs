use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns `host[:port]` for a URL, the port only when it is not the scheme default
///
/// This is what the manifest records as `base_netloc` and what names the output folder.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_harvest::url::netloc;
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(netloc(&url), "localhost:8080");
/// ```
pub fn netloc(url: &Url) -> String {
    let host = extract_domain(url).unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}
