//! Logging setup shared by the binaries

use tracing_subscriber::EnvFilter;

/// Picks the log filter for the `-v`/`-q` flags
pub fn filter_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "recrawler=info,warn",
        1 => "recrawler=debug,info",
        2 => "recrawler=trace,debug",
        _ => "trace",
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
pub fn setup_logging(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(verbose, quiet)))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
