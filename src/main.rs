//! Catwalk main entry point
//!
//! Command-line interface for the Catwalk catalog crawler.

use anyhow::Context;
use catwalk::config::load_config;
use catwalk::crawler::{CrawlOutcome, Coordinator};
use catwalk::extract::BooksExtractor;
use catwalk::output::CsvSink;
use catwalk::record::DEDUP_FIELD;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Catwalk: a resumable, polite catalog crawler
///
/// Catwalk walks a catalog site's paginated listing pages, extracts one
/// record per product, and appends results to a CSV file as it goes.
/// Progress is checkpointed after every page, so rerunning the command
/// resumes an interrupted crawl instead of starting over.
#[derive(Parser, Debug)]
#[command(name = "catwalk")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, polite catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore any existing checkpoint and start from the base URL
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "dedup")]
    dry_run: bool,

    /// Deduplicate an existing output store and exit
    #[arg(long, conflicts_with = "dry_run")]
    dedup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration; failure here is the nonzero-exit path
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.dedup {
        handle_dedup(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catwalk=info,warn"),
            1 => EnvFilter::new("catwalk=debug,info"),
            2 => EnvFilter::new("catwalk=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &catwalk::config::Config) {
    println!("=== Catwalk Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max attempts per URL: {}", config.crawler.max_attempts);
    println!("  Polite delay: {}ms", config.crawler.polite_delay_ms);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  CSV store: {}", config.output.csv_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl listing pages starting at {}", config.crawler.base_url);
}

/// Handles the --dedup mode: deduplicates the output store and exits
fn handle_dedup(config: &catwalk::config::Config) -> anyhow::Result<()> {
    let sink = CsvSink::new(&config.output.csv_path)
        .with_context(|| format!("failed to open output store {}", config.output.csv_path))?;

    let kept = sink
        .deduplicate(DEDUP_FIELD)
        .context("failed to deduplicate output store")?;

    println!("✓ Deduplicated {}: {} rows kept", config.output.csv_path, kept);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: catwalk::config::Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoint if one exists)");
    }

    let mut coordinator = Coordinator::new(config, BooksExtractor::new(), fresh)
        .context("failed to set up crawl")?;

    // Honor Ctrl-C at page boundaries: the in-flight page still persists
    // and checkpoints before the loop exits.
    let stop = coordinator.shutdown_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Stop requested; finishing the current page before exiting");
            stop.store(true, Ordering::Relaxed);
        }
    });

    // Every terminal outcome is a clean exit; the outcome lines themselves
    // are logged by the coordinator.
    match coordinator.run().await {
        CrawlOutcome::Finished => tracing::info!("Crawl completed"),
        CrawlOutcome::ListingFetchFailed => {
            tracing::warn!("Crawl stopped early; rerun later to resume from the checkpoint")
        }
        CrawlOutcome::Interrupted => {
            tracing::warn!("Crawl interrupted; rerun to resume from the checkpoint")
        }
    }

    Ok(())
}
