//! Per-invocation crawl state
//!
//! A [`CrawlSession`] owns everything that must not leak between two crawls:
//! the pages already visited, the documents already queued, and the file
//! names already handed out. It is created at the start of a supervisor
//! attempt and dropped at its end.

use crate::url::normalize_url;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct CrawlSession {
    download_dir: PathBuf,

    /// Normalized page URLs already fetched as pages (same host as the seed)
    visited_pages: HashSet<String>,

    /// Normalized document URLs already turned into tasks
    seen_documents: HashSet<String>,

    /// Every file name handed out so far, lowercased
    issued: HashSet<String>,

    /// Stem -> next suffix to try for it
    next_suffix: HashMap<String, u32>,
}

impl CrawlSession {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            visited_pages: HashSet::new(),
            seen_documents: HashSet::new(),
            issued: HashSet::new(),
            next_suffix: HashMap::new(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Marks a page as visited; returns false if it already was
    pub fn mark_page_visited(&mut self, url: &str) -> bool {
        self.visited_pages.insert(normalize_url(url))
    }

    /// Marks a document as queued; returns false if it already was
    pub fn mark_document_seen(&mut self, url: &str) -> bool {
        self.seen_documents.insert(normalize_url(url))
    }

    pub fn visited_page_count(&self) -> usize {
        self.visited_pages.len()
    }

    pub fn seen_document_count(&self) -> usize {
        self.seen_documents.len()
    }

    pub fn has_visited(&self, url: &str) -> bool {
        self.visited_pages.contains(&normalize_url(url))
    }

    /// Returns a file name unique within this session
    ///
    /// The first request for a name returns it unchanged; later requests get
    /// `_2`, `_3`, ... inserted before the extension, skipping any candidate
    /// already issued. Names are compared case-insensitively.
    pub fn claim_file_name(&mut self, file_name: &str) -> String {
        if self.issued.insert(file_name.to_lowercase()) {
            return file_name.to_string();
        }

        let (stem, extension) = split_extension(file_name);
        let next = self.next_suffix.entry(stem.to_lowercase()).or_insert(2);
        loop {
            let candidate = format!("{}_{}{}", stem, next, extension);
            *next += 1;
            if self.issued.insert(candidate.to_lowercase()) {
                return candidate;
            }
        }
    }
}

/// Splits `name.ext` into (`name`, `.ext`); names without a dot keep an empty extension
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}
