use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent used for both pages and documents
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Main configuration structure for Paper-Trawl
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults below, and CLI flags may override them afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub naming: NamingConfig,
}

/// What to crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Seed page whose document links (and one-hop children) are harvested
    #[serde(rename = "seed-url", default)]
    pub seed_url: Option<String>,
}

/// Crawl orchestration and outer retry behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent document fetches
    #[serde(rename = "max-concurrent-downloads", default = "default_concurrency")]
    pub max_concurrent_downloads: u32,

    /// Total supervisor attempts (first try included)
    #[serde(rename = "max-attempts", default = "default_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between supervisor attempts (seconds)
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Ceiling on one full discover-and-fetch attempt (seconds)
    #[serde(rename = "attempt-timeout-secs", default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Timeout for fetching a single HTML page (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
}

/// Per-document fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Attempts per document before giving up
    #[serde(rename = "max-attempts", default = "default_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay, doubled on each attempt (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound (exclusive) of the random jitter added to each backoff (milliseconds)
    #[serde(rename = "max-jitter-ms", default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_io_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Applies to response headers and to every body chunk
    #[serde(rename = "read-timeout-secs", default = "default_io_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// File extension identifying document links (without the dot)
    #[serde(rename = "document-extension", default = "default_extension")]
    pub document_extension: String,

    /// Leading bytes every downloaded document must start with
    #[serde(rename = "magic-header", default = "default_magic_header")]
    pub magic_header: String,
}

/// Where results land
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "download-dir", default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Write a master index of short name to original title
    #[serde(rename = "write-index", default = "default_true")]
    pub write_index: bool,

    #[serde(rename = "index-file", default = "default_index_file")]
    pub index_file: String,
}

/// File-name resolution settings
#[derive(Debug, Clone, Deserialize)]
pub struct NamingConfig {
    /// Context used when a page carries no `<Month> <Year>` signal
    #[serde(rename = "default-context", default = "default_context")]
    pub default_context: String,
}

impl CrawlerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

impl FetcherConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_concurrency(),
            max_attempts: default_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            page_timeout_secs: default_page_timeout_secs(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            connect_timeout_secs: default_io_timeout_secs(),
            read_timeout_secs: default_io_timeout_secs(),
            user_agent: default_user_agent(),
            document_extension: default_extension(),
            magic_header: default_magic_header(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            write_index: true,
            index_file: default_index_file(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            default_context: default_context(),
        }
    }
}

fn default_concurrency() -> u32 {
    4
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_attempt_timeout_secs() -> u64 {
    600
}

fn default_page_timeout_secs() -> u64 {
    15
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_io_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_extension() -> String {
    "pdf".to_string()
}

fn default_magic_header() -> String {
    "%PDF".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_true() -> bool {
    true
}

fn default_index_file() -> String {
    "Master.txt".to_string()
}

fn default_context() -> String {
    "ICAI".to_string()
}
