//! Granary main entry point
//!
//! Command-line interface for the Granary ingestion pipeline: loads a TOML
//! configuration, wires a source connector to the HTTP indexer, and runs
//! one crawl to completion.

use anyhow::Context;
use clap::Parser;
use granary::config::load_config_with_hash;
use granary::indexer::{HttpIndexer, PassthroughTabularParser};
use granary::pipeline::{CancelSignal, CrawlOrchestrator, SupportedExtensions};
use granary::source::{BulkJsonSource, FolderSource, SourceEnumerator, SourceMode};
use granary::CrawlRunSummary;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Granary: a document ingestion pipeline
///
/// Granary enumerates documents from a configured source, enriches their
/// metadata, and routes each one to an indexing service under concurrency,
/// rate-limit, and retry policy.
#[derive(Parser, Debug)]
#[command(name = "granary")]
#[command(version = "1.0.0")]
#[command(about = "A document ingestion pipeline", long_about = None)]
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

    /// Validate config and show what would be ingested without running
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("granary=info,warn"),
            1 => EnvFilter::new("granary=debug,info"),
            2 => EnvFilter::new("granary=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the effective run
fn handle_dry_run(config: &granary::Config) {
    println!("=== Granary Dry Run ===\n");

    println!("Source:");
    println!("  Mode: {}", config.source.mode);
    if let Some(path) = &config.source.path {
        println!("  Path: {}", path);
    }
    println!("  Source tag: {}", config.source.source_tag);
    println!("  Extensions: {:?}", config.source.extensions);
    if let Some(table) = &config.source.metadata_table_path {
        println!("  Metadata table: {}", table);
    }

    println!("\nPipeline:");
    println!("  Concurrency: {}", config.pipeline.concurrency);
    println!(
        "  Rate limit: {} calls/sec",
        config.pipeline.rate_limit_per_second
    );
    println!(
        "  Retry: {} attempts, {}s fixed delay",
        config.pipeline.retry_attempts, config.pipeline.retry_delay_seconds
    );

    println!("\nIndexer:");
    println!("  Endpoint: {}", config.indexer.endpoint);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: granary::Config) -> anyhow::Result<()> {
    let mut enumerator = build_enumerator(&config)?;

    let indexer = Arc::new(HttpIndexer::new(&config.indexer)?);
    let tabular = Arc::new(PassthroughTabularParser::new(indexer.clone()));
    let orchestrator = CrawlOrchestrator::new(config, indexer, tabular);

    // Ctrl-C stops submission of new items and drains in-flight work.
    let cancel = CancelSignal::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, draining in-flight items");
            signal.cancel();
        }
    });

    match orchestrator.run(enumerator.as_mut(), &cancel).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(error) => {
            tracing::error!("Crawl failed: {}", error);
            Err(error.into())
        }
    }
}

/// Builds the source enumerator for the configured mode
fn build_enumerator(config: &granary::Config) -> anyhow::Result<Box<dyn SourceEnumerator>> {
    let path = config.source.path.clone().unwrap_or_default();

    match config.source.mode {
        SourceMode::Folder => Ok(Box::new(FolderSource::new(
            path,
            config.source.source_tag.clone(),
            SupportedExtensions::from_config(&config.source.extensions),
            config.source.metadata_table_path.clone().map(PathBuf::from),
        ))),
        SourceMode::BulkJson => Ok(Box::new(BulkJsonSource::new(
            path,
            config.source.source_tag.clone(),
        ))),
        mode @ (SourceMode::SharepointFolder | SourceMode::SharepointList | SourceMode::Catalog) => {
            anyhow::bail!(
                "source mode '{}' requires an external connector; \
                 this binary bundles 'folder' and 'bulk-json' only",
                mode
            )
        }
    }
}

/// Prints the run summary to stdout
fn print_summary(summary: &CrawlRunSummary) {
    println!("=== Crawl Summary ===\n");
    println!("  Processed: {}", summary.processed);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed:    {}", summary.failed);
    println!("  Skipped:   {}", summary.skipped);

    if !summary.failures.is_empty() {
        println!("\nFailures ({}):", summary.failures.len());
        for outcome in &summary.failures {
            if let granary::OutcomeStatus::Failed { reason } = &outcome.status {
                println!(
                    "  - {} ({} attempts): {}",
                    outcome.item_id, outcome.attempts, reason
                );
            }
        }
    }
}
