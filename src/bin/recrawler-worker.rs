//! Recrawler worker process
//!
//! Pulls jobs from the shared queues and crawls until stopped. Also hosts the
//! operator commands for inspecting the frontier and clearing dedup records.

use anyhow::Context;
use clap::{Parser, Subcommand};
use recrawler::config::{load_config_or_default, Config};
use recrawler::logging::setup_logging;
use recrawler::output::{load_statistics, print_statistics, print_summary};
use recrawler::storage::SqliteStorage;
use recrawler::Crawler;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recrawler worker: crawls the shared frontier
#[derive(Parser, Debug)]
#[command(name = "recrawler-worker")]
#[command(version)]
#[command(about = "Crawl the shared frontier and manage its state", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl until stopped (default)
    Run,

    /// Crawl until both queues are empty, then print a summary
    Drain,

    /// Show dedup, queue and page counts and exit
    Stats,

    /// Clear a URL's dedup record so it can be seeded or discovered again
    Forget {
        /// The URL to forget
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config =
        load_config_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => handle_run(&config).await,
        Command::Drain => handle_drain(&config).await,
        Command::Stats => handle_stats(&config),
        Command::Forget { url } => handle_forget(&config, &url),
    }
}

/// Runs the worker loop until the process is stopped
async fn handle_run(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Database: {}", config.storage.database_path);
    tracing::info!(
        "Recrawl factors: update-frequency={}, importance={}",
        config.crawler.update_frequency,
        config.crawler.importance
    );

    let crawler = Crawler::from_config(config).context("Failed to start crawler")?;
    Arc::new(crawler).run().await;
    Ok(())
}

/// Crawls until this worker finds nothing left to do
async fn handle_drain(config: &Config) -> anyhow::Result<()> {
    let crawler = Arc::new(Crawler::from_config(config).context("Failed to start crawler")?);
    let summary = crawler.run_until_idle().await;
    print_summary(&summary);
    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open database {}", config.storage.database_path))
}

/// Prints frontier statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(config)?;
    let stats = load_statistics(&storage, &storage, &storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Removes a URL's dedup record
fn handle_forget(config: &Config, url: &str) -> anyhow::Result<()> {
    use recrawler::crawler::Frontier;

    let storage = Arc::new(open_storage(config)?);
    let frontier = Frontier::new(storage.clone(), storage);

    if frontier.forget(url)? {
        println!("Forgot {}; it will be crawled again when next seeded or discovered", url);
    } else {
        println!("{} was not in the dedup store", url);
    }

    Ok(())
}
