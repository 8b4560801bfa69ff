//! Page context resolution
//!
//! The context of a page is the exam sitting it is about, written as
//! `{Mon}{Year}` (e.g. `May2025`). It is folded into file-name resolution for
//! every document link on that page.

use crate::crawler::ParsedPage;
use regex::Regex;
use std::sync::OnceLock;

/// Derives a short context label for a parsed page
pub trait ContextResolver: Send + Sync {
    fn resolve_context(&self, page: &ParsedPage) -> String;
}

fn month_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{4})\b",
        )
        .expect("month-year regex is valid")
    })
}

/// Finds the first `<Month> <Year>` in the title, then h1-h3, then meta tags
#[derive(Debug, Clone)]
pub struct MonthYearContextResolver {
    default_context: String,
}

impl MonthYearContextResolver {
    pub fn new(default_context: impl Into<String>) -> Self {
        Self {
            default_context: default_context.into(),
        }
    }
}

impl Default for MonthYearContextResolver {
    fn default() -> Self {
        Self::new("ICAI")
    }
}

impl ContextResolver for MonthYearContextResolver {
    fn resolve_context(&self, page: &ParsedPage) -> String {
        page.title
            .iter()
            .chain(page.headings.iter())
            .chain(page.meta.iter())
            .find_map(|text| month_year(text))
            .unwrap_or_else(|| self.default_context.clone())
    }
}

fn month_year(text: &str) -> Option<String> {
    let caps = month_year_re().captures(text)?;
    let month = &caps[1];

    let mut label: String = month
        .chars()
        .take(3)
        .enumerate()
        .map(|(i, c)| if i == 0 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
        .collect();
    label.push_str(&caps[2]);
    Some(label)
}
