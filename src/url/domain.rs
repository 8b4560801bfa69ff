use url::Url;

/// Extracts the host from a URL string
///
/// Malformed URLs and URLs without a host degrade to an empty string.
///
/// # Examples
///
/// ```
/// use paper_trawl::url::host_of;
///
/// assert_eq!(host_of("https://example.com/path"), "example.com");
/// assert_eq!(host_of("https://example.com:8080/"), "example.com");
/// assert_eq!(host_of("not a url"), "");
/// ```
pub fn host_of(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_default()
}

/// Returns true if the URL uses the http or https scheme
pub fn is_http(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
