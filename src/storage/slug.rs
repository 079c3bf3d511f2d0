use url::Url;

/// Longest folder name produced before truncation
const MAX_FOLDER_LEN: usize = 120;

/// Derives the folder name for a page
///
/// # Rules
///
/// - The seed page is `home`
/// - Otherwise the path, with leading/trailing `/` trimmed and `/` replaced by `_`
/// - An empty path is `root`
/// - A query is appended as `_<percent-encoded query>`
/// - Characters outside `[A-Za-z0-9._%-]` become `_`; a leading `.` becomes `_`
/// - Names longer than 120 characters are truncated
///
/// # Examples
///
/// ```
/// use site_harvest::storage::folder_name;
/// use url::Url;
///
/// let seed = Url::parse("https://example.com/").unwrap();
/// let page = Url::parse("https://example.com/docs/intro").unwrap();
/// assert_eq!(folder_name(&seed, &seed), "home");
/// assert_eq!(folder_name(&page, &seed), "docs_intro");
/// ```
pub fn folder_name(url: &Url, seed: &Url) -> String {
    if url.as_str().trim_end_matches('/') == seed.as_str().trim_end_matches('/') {
        return "home".to_string();
    }

    let mut name = url.path().trim_matches('/').to_string();
    if name.is_empty() {
        name = "root".to_string();
    }

    if let Some(query) = url.query() {
        name.push('_');
        name.push_str(&urlencoding::encode(query));
    }

    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '%') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.starts_with('.') {
        sanitized.replace_range(0..1, "_");
    }

    if sanitized.len() > MAX_FOLDER_LEN {
        sanitized.truncate(MAX_FOLDER_LEN);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_seed_is_home() {
        let seed = url("https://example.com/");
        assert_eq!(folder_name(&seed, &seed), "home");
    }

    #[test]
    fn test_seed_with_path_is_home() {
        let seed = url("https://example.com/blog");
        assert_eq!(folder_name(&url("https://example.com/blog/"), &seed), "home");
    }

    #[test]
    fn test_root_when_seed_has_path() {
        let seed = url("https://example.com/blog");
        assert_eq!(folder_name(&url("https://example.com/"), &seed), "root");
    }

    #[test]
    fn test_nested_path() {
        let seed = url("https://example.com/");
        assert_eq!(
            folder_name(&url("https://example.com/a/b/c"), &seed),
            "a_b_c"
        );
    }

    #[test]
    fn test_query_appended_encoded() {
        let seed = url("https://example.com/");
        assert_eq!(
            folder_name(&url("https://example.com/list?page=2&sort=asc"), &seed),
            "list_page%3D2%26sort%3Dasc"
        );
    }

    #[test]
    fn test_query_on_root() {
        let seed = url("https://example.com/");
        assert_eq!(
            folder_name(&url("https://example.com/?p=1"), &seed),
            "root_p%3D1"
        );
    }

    #[test]
    fn test_unsafe_characters_replaced() {
        let seed = url("https://example.com/");
        let name = folder_name(&url("https://example.com/a:b/c*d"), &seed);
        assert!(!name.contains(':'));
        assert!(!name.contains('*'));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_no_leading_dot() {
        let seed = url("https://example.com/");
        let name = folder_name(&url("https://example.com/.well-known/x"), &seed);
        assert_eq!(name, "_well-known_x");
    }

    #[test]
    fn test_long_name_truncated() {
        let seed = url("https://example.com/");
        let long = format!("https://example.com/{}", "a".repeat(300));
        assert_eq!(folder_name(&url(&long), &seed).len(), MAX_FOLDER_LEN);
    }
}
