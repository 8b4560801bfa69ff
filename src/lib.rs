//! Paper-Trawl: a one-hop document harvester
//!
//! This crate discovers document links on a seed page (and on same-site pages
//! linked directly from it), then downloads the documents concurrently with
//! bounded parallelism, per-fetch retries, integrity checks and an outer
//! retry/timeout supervisor.

pub mod config;
pub mod crawler;
pub mod naming;
pub mod output;
pub mod supervisor;
pub mod url;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use crawler::FetchError;

/// Main error type for operation-level failures
///
/// Task-level failures are represented by [`FetchError`] and are tallied by
/// the scheduler; only the variants below can end a whole attempt.
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create download directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("DNS resolution failed for {url}: {message}")]
    Dns { url: String, message: String },

    #[error("Failed to fetch page {url}: {source}")]
    Page { url: String, source: FetchError },

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl TrawlError {
    /// Returns true if retrying the whole operation cannot help
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Directory { .. } | Self::Dns { .. } | Self::Cancelled
        )
    }

    /// Lifts a page fetch failure into an operation-level error
    ///
    /// DNS failures and cancellation keep their own variants so the
    /// supervisor can treat them as fatal.
    pub fn from_page(url: &str, error: FetchError) -> Self {
        match error {
            FetchError::Dns { message, .. } => Self::Dns {
                url: url.to_string(),
                message,
            },
            FetchError::Cancelled => Self::Cancelled,
            other => Self::Page {
                url: url.to_string(),
                source: other,
            },
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Paper-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, CrawlSession, FetchTask};
pub use supervisor::{Supervisor, SupervisorReport, SupervisorState};
pub use crate::url::{host_of, is_document_link, normalize_url};
