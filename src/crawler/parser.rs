//! HTML parser for extracting anchors and page-level signals
//!
//! This module handles parsing HTML content to extract:
//! - Anchors with their resolved absolute URLs and visible text
//! - Page title, headings and meta descriptions (used for context resolution)

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A single `<a href>` element found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// The raw `href` attribute as written in the page
    pub href: String,

    /// The absolute URL after resolving against the page URL
    pub url: String,

    /// Whitespace-collapsed visible text (may be empty)
    pub text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The URL the page was fetched from
    pub url: String,

    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Text of h1, h2 and h3 elements in document order
    pub headings: Vec<String>,

    /// `content` of meta description and keywords tags
    pub meta: Vec<String>,

    /// All anchors found on the page, in document order
    pub anchors: Vec<Anchor>,
}

/// Parses HTML content and extracts anchors and metadata
///
/// # Anchor Extraction Rules
///
/// **Include:** every `<a href="...">` whose href resolves against `base_url`.
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Hrefs that cannot be resolved
///
/// # Example
///
/// ```
/// use paper_trawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Papers</title></head><body><a href="/a.pdf">A</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Papers".to_string()));
/// assert_eq!(parsed.anchors[0].url, "https://example.com/a.pdf");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        url: base_url.to_string(),
        title: extract_title(&document),
        headings: extract_text_of(&document, "h1, h2, h3"),
        meta: extract_meta(&document),
        anchors: extract_anchors(&document, base_url),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element_text(&element))
        .filter(|s| !s.is_empty())
}

fn extract_text_of(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element_text(&element))
        .filter(|s| !s.is_empty())
        .collect()
}

fn extract_meta(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("meta[name=description], meta[name=keywords]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn extract_anchors(document: &Html, base_url: &Url) -> Vec<Anchor> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_link(href, base_url)?;
            Some(Anchor {
                href: href.trim().to_string(),
                url,
                text: element_text(&element),
            })
        })
        .collect()
}

/// Collapses all descendant text nodes into single-spaced text
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only and empty hrefs
/// - hrefs the URL parser rejects
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    base_url.join(href).ok().map(|u| u.to_string())
}
