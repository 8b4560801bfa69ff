//! Crawler - one-hop document discovery
//!
//! This module walks the seed page and every same-host page linked directly
//! from it, collecting document links along the way. It never goes deeper
//! than one hop and never downloads documents itself.

use crate::crawler::collector::PageCollector;
use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::parser::{parse_html, ParsedPage};
use crate::crawler::session::CrawlSession;
use crate::crawler::task::FetchTask;
use crate::naming::ContextResolver;
use crate::output::DownloadObserver;
use crate::url::{host_of, is_http};
use crate::TrawlError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Discovers fetch tasks from a seed page and its same-site neighbours
pub struct Crawler {
    client: Client,
    collector: PageCollector,
    context_resolver: Arc<dyn ContextResolver>,
    observer: Arc<dyn DownloadObserver>,
    page_timeout: Duration,
}

impl Crawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for page fetches
    /// * `collector` - Extracts document links from each page
    /// * `context_resolver` - Derives the naming context of each page
    /// * `observer` - Notified when a child page has to be skipped
    /// * `page_timeout` - Whole-request timeout for a single page
    pub fn new(
        client: Client,
        collector: PageCollector,
        context_resolver: Arc<dyn ContextResolver>,
        observer: Arc<dyn DownloadObserver>,
        page_timeout: Duration,
    ) -> Self {
        Self {
            client,
            collector,
            context_resolver,
            observer,
            page_timeout,
        }
    }

    /// Collects document tasks from the seed page and pages one hop away
    ///
    /// A failure to load the seed page fails the whole discovery; a failing
    /// child page is reported and skipped. Deduplication state lives in
    /// `session`, so the same document found on several pages yields one task.
    ///
    /// # Arguments
    ///
    /// * `seed_url` - The page to start from
    /// * `session` - Per-attempt crawl state
    /// * `cancel` - Checked before every page fetch
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<FetchTask>)` - Tasks in discovery order
    /// * `Err(TrawlError)` - The seed page failed or discovery was cancelled
    pub async fn discover(
        &self,
        seed_url: &str,
        session: &mut CrawlSession,
        cancel: &CancellationToken,
    ) -> Result<Vec<FetchTask>, TrawlError> {
        let seed = Url::parse(seed_url)?;
        let seed_host = host_of(seed.as_str());

        tracing::info!("Fetching seed page {}", seed);
        session.mark_page_visited(seed.as_str());

        let seed_page = self
            .load_page(&seed, cancel)
            .await
            .map_err(|e| TrawlError::from_page(seed_url, e))?;

        let mut tasks = self.collect(&seed_page, session);
        tracing::info!(
            "Seed page yielded {} documents and {} links",
            tasks.len(),
            seed_page.anchors.len()
        );

        for anchor in &seed_page.anchors {
            if !is_http(&anchor.url)
                || self.collector.is_document_link(&anchor.url)
                || seed_host.is_empty()
                || host_of(&anchor.url) != seed_host
            {
                continue;
            }

            if !session.mark_page_visited(&anchor.url) {
                continue;
            }

            if cancel.is_cancelled() {
                return Err(TrawlError::Cancelled);
            }

            let Ok(page_url) = Url::parse(&anchor.url) else {
                continue;
            };

            tracing::debug!("Following {}", page_url);
            match self.load_page(&page_url, cancel).await {
                Ok(page) => {
                    let found = self.collect(&page, session);
                    tracing::debug!("{} yielded {} new documents", page_url, found.len());
                    tasks.extend(found);
                }
                Err(FetchError::Cancelled) => return Err(TrawlError::Cancelled),
                Err(e) => {
                    let message = format!("Skipping page {}: {}", page_url, e);
                    tracing::warn!("{}", message);
                    self.observer.on_error(&message);
                }
            }
        }

        tracing::info!(
            "Discovery visited {} pages and found {} documents",
            session.visited_page_count(),
            tasks.len()
        );

        Ok(tasks)
    }

    async fn load_page(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<ParsedPage, FetchError> {
        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            body = fetch_page(&self.client, url.as_str(), self.page_timeout) => body?,
        };

        Ok(parse_html(&body, url))
    }

    fn collect(&self, page: &ParsedPage, session: &mut CrawlSession) -> Vec<FetchTask> {
        let context = self.context_resolver.resolve_context(page);
        self.collector.collect(page, &context, session)
    }
}
