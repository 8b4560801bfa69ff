//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with a browser-like user agent
//! - GET requests for HTML pages
//! - Streaming document downloads to disk
//! - Retry logic with exponential backoff and jitter
//! - Post-download integrity verification
//! - Error classification

use crate::config::FetcherConfig;
use crate::crawler::task::FetchTask;
use async_trait::async_trait;
use futures::StreamExt;
use rand::Rng;
use reqwest::header::{ACCEPT, CONNECTION};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

/// Size of the write buffer between the response stream and the file
const BUFFER_SIZE: usize = 16 * 1024;

const DOCUMENT_ACCEPT: &str = "application/pdf,application/octet-stream,*/*";
const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,*/*;q=0.8";

/// Errors for a single page or document fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("File not found (404): {url}")]
    NotFound { url: String },

    #[error("Access forbidden (403): {url}")]
    Forbidden { url: String },

    #[error("Service unavailable (503): {url}")]
    Unavailable { url: String },

    #[error("HTTP {status}: {url}")]
    Http { url: String, status: u16 },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("DNS resolution failed for {url}: {message}")]
    Dns { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Integrity check failed for {}: {reason}", path.display())]
    Integrity { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns true for transient transport failures worth another attempt
    ///
    /// 404/403, DNS failures, integrity failures, local IO errors and
    /// cancellation are permanent for the lifetime of one fetch.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. }
                | Self::Http { .. }
                | Self::Connect { .. }
                | Self::Timeout { .. }
                | Self::Network { .. }
        )
    }

    /// Returns the innermost error, looking through [`FetchError::Exhausted`]
    pub fn root(&self) -> &FetchError {
        match self {
            Self::Exhausted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// How a successful fetch was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The document was downloaded and verified
    Downloaded { bytes: u64, attempts: u32 },

    /// A non-empty file was already at the target path; no request was made
    AlreadyPresent { bytes: u64 },
}

/// Retrieves a single document to local storage
///
/// Implementations must observe `cancel` at their own safe points and return
/// [`FetchError::Cancelled`] once it fires.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        task: &FetchTask,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError>;
}

/// Per-fetch retry schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for each later one
    pub base_delay: Duration,

    /// Exclusive upper bound of the uniform random jitter
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }

    /// Backoff after the given (1-based) failed attempt, with explicit jitter
    pub fn backoff(&self, attempt: u32, jitter: Duration) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent) + jitter
    }

    /// Backoff after the given failed attempt with a freshly drawn jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff(attempt, self.random_jitter())
    }

    fn random_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// Builds the HTTP client shared by page and document fetches
///
/// The client sets no whole-request timeout. Stalls are caught by the
/// per-read timeout applied in [`HttpFetcher`] and by the per-request page
/// timeout.
///
/// # Example
///
/// ```
/// use paper_trawl::config::FetcherConfig;
/// use paper_trawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches an HTML page and returns its body
///
/// Only HTTP 200 is accepted; other statuses map to the same error kinds as
/// document fetches.
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .header(ACCEPT, PAGE_ACCEPT)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_request_error(url, &e))?;

    check_status(url, response.status())?;

    response
        .text()
        .await
        .map_err(|e| classify_request_error(url, &e))
}

/// Streams documents over HTTP with retries and header verification
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    read_timeout: Duration,
    magic_header: Vec<u8>,
}

impl HttpFetcher {
    pub fn new(client: Client, config: &FetcherConfig) -> Self {
        Self {
            client,
            policy: RetryPolicy::from_config(config),
            read_timeout: config.read_timeout(),
            magic_header: config.magic_header.as_bytes().to_vec(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One request: stream the body to the part file, verify, then rename
    async fn attempt(
        &self,
        task: &FetchTask,
        cancel: &CancellationToken,
    ) -> Result<u64, FetchError> {
        let url = task.source_url.as_str();

        let request = self
            .client
            .get(url)
            .header(ACCEPT, DOCUMENT_ACCEPT)
            .header(CONNECTION, "close");

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            sent = tokio::time::timeout(self.read_timeout, request.send()) => match sent {
                Err(_) => return Err(FetchError::Timeout { url: url.to_string() }),
                Ok(Err(e)) => return Err(classify_request_error(url, &e)),
                Ok(Ok(response)) => response,
            },
        };

        check_status(url, response.status())?;

        let partial = task.partial_path();
        let file = File::create(&partial).await?;
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    // Keep what was written so far; the part file never shadows the target
                    writer.flush().await.ok();
                    return Err(FetchError::Cancelled);
                }
                next = tokio::time::timeout(self.read_timeout, stream.next()) => next,
            };

            match next {
                Err(_) => return Err(FetchError::Timeout { url: url.to_string() }),
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(classify_request_error(url, &e)),
                Ok(Some(Ok(chunk))) => {
                    writer.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
            }
        }

        writer.flush().await?;
        drop(writer);

        self.verify(&partial).await?;
        fs::rename(&partial, task.target_path()).await?;

        Ok(written)
    }

    /// Checks that the file exists, is non-empty and starts with the magic header
    async fn verify(&self, path: &Path) -> Result<(), FetchError> {
        let integrity = |reason: &str| FetchError::Integrity {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let metadata = fs::metadata(path)
            .await
            .map_err(|_| integrity("file was not created"))?;

        if metadata.len() == 0 {
            return Err(integrity("file is empty"));
        }

        let mut header = vec![0u8; self.magic_header.len()];
        let mut file = File::open(path).await?;
        match file.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(integrity("file is shorter than the document header"));
            }
            Err(e) => return Err(e.into()),
        }

        if header != self.magic_header {
            return Err(integrity("missing document header"));
        }

        Ok(())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        task: &FetchTask,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        if let Some(bytes) = existing_size(&task.target_path()).await {
            tracing::debug!("{} already present ({} bytes), skipping", task.file_name, bytes);
            return Ok(FetchOutcome::AlreadyPresent { bytes });
        }

        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            match self.attempt(task, cancel).await {
                Ok(bytes) => {
                    return Ok(FetchOutcome::Downloaded {
                        bytes,
                        attempts: attempt,
                    })
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.policy.max_attempts => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    })
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.policy.max_attempts,
                        task.source_url,
                        e,
                        delay
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Size of a non-empty regular file at `path`, if there is one
async fn existing_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .await
        .ok()
        .filter(|m| m.is_file() && m.len() > 0)
        .map(|m| m.len())
}

/// Maps a non-200 status to its error kind
pub(crate) fn check_status(url: &str, status: StatusCode) -> Result<(), FetchError> {
    let url = url.to_string();
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::NOT_FOUND => Err(FetchError::NotFound { url }),
        StatusCode::FORBIDDEN => Err(FetchError::Forbidden { url }),
        StatusCode::SERVICE_UNAVAILABLE => Err(FetchError::Unavailable { url }),
        other => Err(FetchError::Http {
            url,
            status: other.as_u16(),
        }),
    }
}

/// Classifies a reqwest error into timeout, DNS, connect or generic network
pub(crate) fn classify_request_error(url: &str, error: &reqwest::Error) -> FetchError {
    let url = url.to_string();
    let message = error_chain(error);

    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if is_dns_failure(&message) {
        FetchError::Dns { url, message }
    } else if error.is_connect() {
        FetchError::Connect { url, message }
    } else {
        FetchError::Network { url, message }
    }
}

/// Joins an error with all of its sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Resolver failures surface only as text through hyper's connector
fn is_dns_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    [
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}
