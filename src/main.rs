//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest collector.

use anyhow::{bail, Context};
use clap::Parser;
use listing_harvest::browser::ChromeSession;
use listing_harvest::config::{load_config_with_hash, Config};
use listing_harvest::enrich::{enrich_records, AdHocDataClient};
use listing_harvest::output::{
    load_saved_statistics, persist_records, print_saved_statistics, print_summary, HarvestSummary,
};
use listing_harvest::site::{profile_by_name, SiteProfile};
use listing_harvest::{run_harvest, HarvestOptions, RunStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: an incremental directory-listing collector
///
/// Listing-Harvest drives a browser through a directory's "load more"
/// pagination, collects every business listing exactly once, and keeps its
/// CSV and XLSX output current so an interrupted run can be resumed.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental directory-listing collector", long_about = None)]
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

    /// Continue from the saved output and checkpoint
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start from the first page, discarding the checkpoint (default behavior)
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Stop after this many "load more" advances
    #[arg(long, value_name = "N")]
    max_advances: Option<u32>,

    /// Enrich the collected records after the harvest
    #[arg(long)]
    enrich: bool,

    /// Validate config and show the resolved profile without launching a browser
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics about the saved output and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Validation already rejected unknown names
    let profile = profile_by_name(&config.site.profile, &config.site.target_url)
        .with_context(|| format!("unknown site profile '{}'", config.site.profile))?;

    if cli.dry_run {
        handle_dry_run(&config, &profile);
    } else if cli.stats {
        handle_stats(&config, &profile);
    } else {
        handle_harvest(&cli, &config, &config_hash, &profile).await?;
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
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration and profile
fn handle_dry_run(config: &Config, profile: &SiteProfile) {
    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Profile: {}", profile.name);
    println!("  Target: {}", config.site.target_url);
    match profile.guarded_path(&config.site.target_url) {
        Some(path) => println!("  Location guard: {}", path),
        None => println!("  Location guard: none"),
    }

    println!("\nLocators:");
    println!("  Listings: {}", profile.listings.primary);
    for fallback in profile.listings.fallbacks {
        println!("    fallback: {}", fallback);
    }
    println!(
        "  Load more: {} / {:?}",
        profile.load_more.selector, profile.load_more.texts
    );
    println!(
        "  Consent: {} / {:?}",
        profile.consent.selector, profile.consent.texts
    );

    println!("\nHarvest:");
    match config.harvest.max_advances {
        Some(n) => println!("  Max advances: {}", n),
        None => println!("  Max advances: unlimited"),
    }
    println!("  Save interval: {}", config.harvest.save_interval);
    println!("  Failure threshold: {}", config.harvest.failure_threshold);
    if let Some(n) = config.harvest.max_idle_advances {
        println!("  Max idle advances: {}", n);
    }

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    if let Some(path) = &config.browser.chrome_path {
        println!("  Binary: {}", path);
    }

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  XLSX: {}", config.output.xlsx_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    println!("\nColumns ({}):", profile.columns.len());
    for column in &profile.columns {
        println!("  - {}", column.header);
    }

    println!("\nEnrichment: {}", if config.enrichment.enabled { "on" } else { "off" });

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows what the previous run left behind
fn handle_stats(config: &Config, profile: &SiteProfile) {
    println!("CSV: {}", config.output.csv_path);
    println!("XLSX: {}\n", config.output.xlsx_path);

    let stats = load_saved_statistics(
        Path::new(&config.output.csv_path),
        Path::new(&config.output.xlsx_path),
        Path::new(&config.output.checkpoint_path),
        &profile.columns,
    );

    print_saved_statistics(&stats);
}

/// Handles the main harvest operation
async fn handle_harvest(
    cli: &Cli,
    config: &Config,
    config_hash: &str,
    profile: &SiteProfile,
) -> anyhow::Result<()> {
    let mut options = HarvestOptions::from_config(config).with_resume(cli.resume);
    if cli.max_advances.is_some() {
        options = options.with_max_advances(cli.max_advances);
    }

    if cli.resume {
        tracing::info!("Resuming harvest from saved output");
    } else {
        tracing::info!("Starting fresh harvest");
    }

    let status = Arc::new(RunStatus::new());
    let run = status.try_begin()?;

    // Ctrl-C asks the run to stop; it then saves and closes the browser
    let ctrl_c_status = Arc::clone(&status);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            ctrl_c_status.request_stop();
        }
    });

    let session = ChromeSession::launch(&config.browser)
        .await
        .context("failed to start the browser")?;

    let report = run_harvest(session, profile, &options, &run).await;
    let summary = HarvestSummary::from_report(
        &report,
        profile.name,
        &config.site.target_url,
        config_hash,
    );
    let failed = report.is_failed();

    if (cli.enrich || config.enrichment.enabled) && !report.records.is_empty() {
        match AdHocDataClient::from_config(&config.enrichment) {
            Ok(client) => {
                let records = enrich_records(
                    &client,
                    report.records,
                    Duration::from_millis(config.enrichment.delay_ms),
                    &status.stop_signal(),
                )
                .await;

                persist_records(
                    &records,
                    &profile.columns,
                    &options.csv_path,
                    &options.xlsx_path,
                )
                .context("failed to save enriched records")?;
            }
            Err(e) => tracing::warn!("Skipping enrichment: {}", e),
        }
    }

    if !cli.quiet {
        print_summary(&summary);
    }

    if failed {
        bail!(
            "harvest failed: {}",
            summary.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
