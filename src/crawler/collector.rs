//! Document link collection from a parsed page

use crate::crawler::parser::ParsedPage;
use crate::crawler::session::CrawlSession;
use crate::crawler::task::FetchTask;
use crate::naming::NameResolver;
use std::sync::Arc;

/// Turns the document links of one page into fetch tasks
///
/// Links are deduplicated against the session by normalized URL, so the same
/// document linked from several pages is only fetched once.
pub struct PageCollector {
    name_resolver: Arc<dyn NameResolver>,
    extension: String,
}

impl PageCollector {
    pub fn new(name_resolver: Arc<dyn NameResolver>, extension: impl Into<String>) -> Self {
        Self {
            name_resolver,
            extension: extension.into(),
        }
    }

    /// Returns true if the URL ends in the configured document extension
    pub fn is_document_link(&self, url: &str) -> bool {
        crate::url::is_document_link(url, &self.extension)
    }

    /// Collects new document links from `page`, in document order
    ///
    /// # Arguments
    ///
    /// * `page` - The parsed page
    /// * `context` - Context label for the page (see [`crate::naming::ContextResolver`])
    /// * `session` - Crawl session holding the seen-document set and name registry
    ///
    /// # Returns
    ///
    /// One task per document link not already seen in this session
    pub fn collect(
        &self,
        page: &ParsedPage,
        context: &str,
        session: &mut CrawlSession,
    ) -> Vec<FetchTask> {
        let mut tasks = Vec::new();

        for anchor in &page.anchors {
            if !self.is_document_link(&anchor.url) {
                continue;
            }

            if !session.mark_document_seen(&anchor.url) {
                tracing::debug!("Skipping duplicate document link {}", anchor.url);
                continue;
            }

            let base_name = self
                .name_resolver
                .resolve_file_name(&anchor.text, &anchor.href, context);
            let file_name = session.claim_file_name(&base_name);

            tracing::debug!("Queued {} -> {}", anchor.url, file_name);

            tasks.push(FetchTask::new(
                anchor.url.clone(),
                file_name,
                session.download_dir().to_path_buf(),
                anchor.text.clone(),
            ));
        }

        tasks
    }
}
