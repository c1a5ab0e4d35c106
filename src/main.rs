//! eCFR Census main entry point
//!
//! This is the command-line interface for the resumable agency word census.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use ecfr_census::config::{load_config_with_hash, Config};
use ecfr_census::crawler::Coordinator;
use ecfr_census::output::{print_progress, print_report, reconcile_progress};
use ecfr_census::state::CrawlStatus;
use ecfr_census::storage::{open_storage, ProgressStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// eCFR Census: word counts of federal regulations by agency
///
/// Walks agency → CFR title → part, counts the words of every part, and
/// checkpoints after each one so an interrupted crawl resumes where it
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "ecfr-census")]
#[command(version)]
#[command(about = "Resumable word census of eCFR regulations", long_about = None)]
struct Cli {
    /// Number of agencies to process (non-numeric values fall back to the configured count)
    #[arg(value_name = "AGENCIES")]
    agencies: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, ignoring previous progress
    #[arg(long, conflicts_with_all = ["status", "export_report"])]
    fresh: bool,

    /// Show progress of the stored crawl and exit
    #[arg(long, conflicts_with = "export_report")]
    status: bool,

    /// Write the report from stored progress (even if incomplete) and exit
    #[arg(long)]
    export_report: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if cli.status {
        handle_status(&config)
    } else if cli.export_report {
        handle_export_report(&config)
    } else {
        let count = resolve_agency_count(cli.agencies.as_deref(), config.crawler.agency_count);
        handle_crawl(config, config_hash, count, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ecfr_census=info,warn"),
            1 => EnvFilter::new("ecfr_census=debug,info"),
            2 => EnvFilter::new("ecfr_census=trace,debug"),
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

/// Parses the positional agency count
///
/// Absent, zero, or non-numeric input yields `default`.
fn resolve_agency_count(raw: Option<&str>, default: usize) -> usize {
    match raw.map(|s| s.trim().parse::<usize>()) {
        Some(Ok(n)) if n > 0 => n,
        Some(Ok(_)) => default,
        Some(Err(_)) => {
            tracing::warn!(
                "Ignoring non-numeric agency count {:?}, using {}",
                raw.unwrap_or_default(),
                default
            );
            default
        }
        None => default,
    }
}

/// Handles the --status mode: prints the stored checkpoint
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let store = open_storage(&config.output.data_dir);

    match store.load().context("failed to read progress")? {
        Some(progress) => print_progress(&progress, Utc::now()),
        None => println!(
            "No word count has been started in {}",
            config.output.data_dir.display()
        ),
    }

    Ok(())
}

/// Handles the --export-report mode: reconciles stored progress into a report
fn handle_export_report(config: &Config) -> anyhow::Result<()> {
    let mut store = open_storage(&config.output.data_dir);

    let progress = store
        .load()
        .context("failed to read progress")?
        .with_context(|| {
            format!(
                "no progress recorded in {}",
                config.output.data_dir.display()
            )
        })?;

    if progress.status != CrawlStatus::Completed {
        tracing::warn!(
            "Exporting report from a {} crawl; counts are partial",
            progress.status
        );
    }

    let report = reconcile_progress(&progress);
    store.write_report(&report).context("failed to write report")?;

    print_report(&report);
    println!("\n✓ Report exported to: {}", store.report_path().display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    count: usize,
    fresh: bool,
) -> anyhow::Result<()> {
    tracing::info!("Starting word count for {} {} agencies...", count, order_label(&config));

    let store = open_storage(&config.output.data_dir);
    let report_path = store.report_path();

    let mut coordinator = Coordinator::new(config, store, fresh, config_hash)
        .context("failed to initialize crawl")?;
    let report = coordinator.run(count).await.context("crawl failed")?;

    let progress = coordinator.progress();
    match progress.status {
        CrawlStatus::Completed => {
            print_report(&report);
            println!("\n✓ Results saved to: {}", report_path.display());
            println!(
                "Total elapsed time: {} minutes",
                progress.elapsed_minutes(Utc::now())
            );
        }
        status => {
            println!(
                "Crawl ended {} with {} / {} agencies completed; rerun to resume",
                status, progress.completed_agencies, progress.total_agencies
            );
        }
    }

    Ok(())
}

fn order_label(config: &Config) -> &'static str {
    match config.crawler.order {
        ecfr_census::config::AgencyOrder::Smallest => "smallest",
        ecfr_census::config::AgencyOrder::Largest => "largest",
    }
}
