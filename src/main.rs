//! Recrawler seeding entry point
//!
//! Admits one seed URL to the shared frontier and exits. The crawl itself is
//! carried out by `recrawler-worker` processes reading the same database.

use clap::Parser;
use recrawler::config::load_config_or_default;
use recrawler::crawler::Frontier;
use recrawler::logging::setup_logging;
use recrawler::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Recrawler: a polite, priority-aware web crawler
///
/// Adds a seed URL to the high-priority queue. Start one or more
/// `recrawler-worker` processes against the same database to crawl it.
#[derive(Parser, Debug)]
#[command(name = "recrawler")]
#[command(version)]
#[command(about = "Seed a polite, priority-aware web crawl", long_about = None)]
struct Cli {
    /// The URL to start crawling from (http or https)
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match load_config_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let storage = match SqliteStorage::new(Path::new(&config.storage.database_path)) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            tracing::error!(
                "Failed to open database {}: {}",
                config.storage.database_path,
                e
            );
            return ExitCode::FAILURE;
        }
    };
    let frontier = Frontier::new(storage.clone(), storage);

    match frontier.seed(&cli.seed) {
        Ok(true) => {
            println!("Seeded {}", cli.seed);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!(
                "{} was already admitted; run `recrawler-worker forget {}` to crawl it again",
                cli.seed, cli.seed
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Cannot seed {}: {}", cli.seed, e);
            ExitCode::FAILURE
        }
    }
}
