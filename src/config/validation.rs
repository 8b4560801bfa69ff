use crate::config::types::{Config, CrawlerConfig, FetcherConfig, OutputConfig, TargetConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent downloads; beyond this a single host is hammered
const MAX_CONCURRENCY: u32 = 64;

/// Validates the entire configuration, including the seed URL
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_settings(config)?;
    validate_target(&config.target)?;
    Ok(())
}

/// Validates everything except the target section
pub(crate) fn validate_settings(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_target(config: &TargetConfig) -> Result<(), ConfigError> {
    let seed = config
        .seed_url
        .as_deref()
        .ok_or_else(|| ConfigError::Validation("seed-url must be provided".to_string()))?;

    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.max_concurrent_downloads
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "crawler max-attempts must be >= 1".to_string(),
        ));
    }

    if config.attempt_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "attempt-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.page_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page-timeout-secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "fetcher max-attempts must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 || config.read_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs and read-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    let extension = &config.document_extension;
    if extension.is_empty() || extension.starts_with('.') || extension.contains('/') {
        return Err(ConfigError::Validation(format!(
            "document-extension must be a bare extension like 'pdf', got '{}'",
            extension
        )));
    }

    if config.magic_header.is_empty() {
        return Err(ConfigError::Validation(
            "magic-header cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "download-dir cannot be empty".to_string(),
        ));
    }

    if config.index_file.is_empty() || config.index_file.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "index-file must be a plain file name, got '{}'",
            config.index_file
        )));
    }

    Ok(())
}
