//! Configuration module for Paper-Trawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All settings have defaults, so a file is only needed to change them.
//!
//! # Example
//!
//! ```no_run
//! use paper_trawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawl.toml")).unwrap();
//! println!("Concurrency: {}", config.crawler.max_concurrent_downloads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetcherConfig, NamingConfig, OutputConfig, TargetConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
