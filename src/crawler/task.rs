//! Units of work and their aggregated outcome

use std::path::PathBuf;

/// A single document to download
///
/// Created during link collection and consumed exactly once by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTask {
    /// Absolute URL of the document
    pub source_url: String,

    /// Target file name inside `download_dir`
    pub file_name: String,

    /// Directory the document is written to
    pub download_dir: PathBuf,

    /// Anchor text the link was found under (may be empty)
    pub title: String,
}

impl FetchTask {
    pub fn new(
        source_url: impl Into<String>,
        file_name: impl Into<String>,
        download_dir: impl Into<PathBuf>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            file_name: file_name.into(),
            download_dir: download_dir.into(),
            title: title.into(),
        }
    }

    /// Final location of the downloaded document
    pub fn target_path(&self) -> PathBuf {
        self.download_dir.join(&self.file_name)
    }

    /// Location the body is streamed to before it is verified
    pub fn partial_path(&self) -> PathBuf {
        self.download_dir.join(format!("{}.part", self.file_name))
    }
}

/// Aggregated outcome of one scheduler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    pub success_count: usize,
    pub failure_count: usize,

    /// One human-readable message per failed task, in completion order
    pub errors: Vec<String>,

    /// Tasks that ended with the document on disk
    pub completed: Vec<FetchTask>,
}

impl CrawlResult {
    /// Number of tasks that reached a terminal outcome
    pub fn total_attempted(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub(crate) fn record_success(&mut self, task: FetchTask) {
        self.success_count += 1;
        self.completed.push(task);
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.failure_count += 1;
        self.errors.push(message);
    }
}
