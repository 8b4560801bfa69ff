/// Normalizes a URL for deduplication
///
/// Only trivial variations are folded together: surrounding whitespace is
/// trimmed and a single trailing slash is removed. Scheme and host case are
/// left untouched, as are query strings and fragments, so two links are only
/// considered the same document when they are textually the same resource.
///
/// # Examples
///
/// ```
/// use paper_trawl::url::normalize_url;
///
/// assert_eq!(normalize_url(" https://example.com/papers/ "), "https://example.com/papers");
/// assert_eq!(normalize_url("https://example.com/a.pdf"), "https://example.com/a.pdf");
/// ```
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
