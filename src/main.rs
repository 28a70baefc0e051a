//! School-Crawler main entry point
//!
//! This is the command-line interface for the school directory crawler.

use anyhow::Context;
use clap::Parser;
use school_crawler::config::{load_config_with_hash, Config, Variant};
use school_crawler::crawler::{crawl, plan_passes};
use school_crawler::output::{split_by_state, todays_results_path};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// School-Crawler: a concurrent crawler for paginated school directories
///
/// School-Crawler walks every listing page of the configured level and
/// sector filters, optionally fetches each school's full address, and writes
/// the deduplicated results to a dated CSV file.
#[derive(Parser, Debug)]
#[command(name = "school-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent crawler for paginated school directories", long_about = None)]
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

    /// Validate config and show the planned passes without crawling
    #[arg(long, conflicts_with = "split_states")]
    dry_run: bool,

    /// Split an existing results file into one file per state and exit
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    split_states: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(input) = &cli.split_states {
        handle_split_states(&config, input).await?;
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("school_crawler=info,warn"),
            1 => EnvFilter::new("school_crawler=debug,info"),
            2 => EnvFilter::new("school_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== School-Crawler Dry Run ===\n");

    let variant = match config.variant {
        Variant::SectorLevel => "sector-level",
        Variant::SingleSector => "single-sector",
    };

    println!("Crawler Configuration:");
    println!("  Variant: {}", variant);
    println!("  Workers per pool: {}", config.thread_num);
    println!("  Full addresses: {}", config.full_address);
    println!("  Dedup identity: {:?}", config.dedup);
    println!("  Retry: {:?}", config.fetch.retry);

    println!("\nOutput:");
    println!(
        "  Results: {}",
        todays_results_path(&config.output.dir).display()
    );
    println!("  States: {}", config.output.states_dir.display());

    let passes = plan_passes(config);
    println!("\nPlanned Passes ({}):", passes.len());
    for pass in &passes {
        println!("  - {}", pass.url(&config.site.base_url));
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --split-states mode
async fn handle_split_states(config: &Config, input: &Path) -> anyhow::Result<()> {
    let counts = split_by_state(input, &config.output.states_dir)
        .await
        .with_context(|| format!("failed to split {}", input.display()))?;

    for (state, count) in &counts {
        println!("{}: {} records", state, count);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Levels: {:?}, Sectors: {:?}, Workers: {}",
        config.filter.levels,
        config.filter.sectors,
        config.thread_num
    );

    let report = crawl(config).await.context("crawl failed")?;

    if report.passes_failed > 0 {
        tracing::warn!(
            "{} of {} passes failed",
            report.passes_failed,
            report.passes_failed + report.passes_completed
        );
    }
    tracing::info!(
        "{} records saved to {}",
        report.records,
        report.output_path.display()
    );

    Ok(())
}
