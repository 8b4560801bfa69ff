//! Crawler module for document discovery and download
//!
//! This module contains the crawl-and-fetch pipeline, including:
//! - HTML parsing and link extraction
//! - Document link collection and naming
//! - One-hop same-site discovery
//! - HTTP fetching with retry logic and integrity checks
//! - Bounded-concurrency scheduling of downloads

mod collector;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod session;
mod task;

pub use collector::PageCollector;
pub use coordinator::Crawler;
pub use fetcher::{
    build_http_client, fetch_page, FetchError, FetchOutcome, Fetcher, HttpFetcher, RetryPolicy,
};
pub use parser::{parse_html, Anchor, ParsedPage};
pub use scheduler::{RunStatus, ScheduleOutcome, Scheduler};
pub use session::CrawlSession;
pub use task::{CrawlResult, FetchTask};
