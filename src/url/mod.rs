//! URL handling module for Paper-Trawl
//!
//! This module provides dedup normalization, host extraction and document
//! link detection.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{host_of, is_http};
pub use normalize::normalize_url;

/// Returns true if the URL names a document with the given extension
///
/// The check is a case-insensitive suffix match on the whole URL string, so
/// `Module2.PDF` and `module2.pdf` both count while `file.pdf?download=1`
/// does not.
///
/// # Examples
///
/// ```
/// use paper_trawl::url::is_document_link;
///
/// assert!(is_document_link("https://example.com/Module2.PDF", "pdf"));
/// assert!(!is_document_link("https://example.com/papers", "pdf"));
/// ```
pub fn is_document_link(url: &str, extension: &str) -> bool {
    if extension.is_empty() {
        return false;
    }

    let url = url.trim().to_ascii_lowercase();
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    url.ends_with(&suffix)
}
