//! Paper-Trawl main entry point
//!
//! This is the command-line interface for the Paper-Trawl document harvester.

use anyhow::Context;
use clap::Parser;
use paper_trawl::config::{load_config_with_hash, validate, Config};
use paper_trawl::output::summary::format_counts;
use paper_trawl::Supervisor;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Paper-Trawl: a one-hop document harvester
///
/// Paper-Trawl finds document links on a seed page and on same-site pages
/// linked directly from it, then downloads them concurrently with retries,
/// integrity checks and an overall per-attempt timeout.
#[derive(Parser, Debug)]
#[command(name = "paper-trawl")]
#[command(version = "1.0.0")]
#[command(about = "A one-hop document harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed page URL (overrides target.seed-url)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Download directory (overrides output.download-dir)
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Maximum concurrent downloads (overrides crawler.max-concurrent-downloads)
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Do not write the master index after a successful run
    #[arg(long)]
    no_index: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discover documents and print the plan without downloading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paper_trawl=info,warn"),
            1 => EnvFilter::new("paper_trawl=debug,info"),
            2 => EnvFilter::new("paper_trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.url {
        config.target.seed_url = Some(url.clone());
    }
    if let Some(dir) = &cli.dir {
        config.output.download_dir = dir.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_downloads = concurrency;
    }
    if cli.no_index {
        config.output.write_index = false;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Returns whether the run succeeded
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = resolve_config(&cli)?;
    let seed_url = config.target.seed_url.clone().unwrap_or_default();
    let download_dir = config.output.download_dir.clone();

    let supervisor = Supervisor::from_config(&config).context("Failed to build HTTP client")?;

    let cancel = supervisor.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });

    if cli.dry_run {
        return handle_dry_run(&supervisor, &seed_url, &download_dir).await;
    }

    tracing::info!(
        "Downloading from {} into {} ({} concurrent, up to {} attempts)",
        seed_url,
        download_dir.display(),
        config.crawler.max_concurrent_downloads,
        supervisor.policy().max_attempts
    );

    let report = supervisor.execute(&seed_url, &download_dir).await;

    if report.success() {
        tracing::info!(
            "Done after {} attempt(s): {}",
            report.attempts,
            format_counts(&report.result)
        );
    } else {
        tracing::error!(
            "Failed after {} attempt(s): {}",
            report.attempts,
            report.state
        );
    }

    Ok(report.success())
}

/// Handles the --dry-run mode: discovers tasks and prints the plan
async fn handle_dry_run(
    supervisor: &Supervisor,
    seed_url: &str,
    download_dir: &std::path::Path,
) -> anyhow::Result<bool> {
    println!("=== Paper-Trawl Dry Run ===\n");
    println!("Seed: {}", seed_url);
    println!("Directory: {}\n", download_dir.display());

    let tasks = supervisor
        .discover_only(seed_url, download_dir)
        .await
        .context("Discovery failed")?;

    for task in &tasks {
        println!("  {} ← {}", task.file_name, task.source_url);
    }

    println!("\n✓ Would download {} documents", tasks.len());
    Ok(true)
}
