//! Configuration module for Recrawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so a missing file is not an error for the binaries.
//!
//! # Example
//!
//! ```no_run
//! use recrawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("recrawler.toml")).unwrap();
//! println!("Concurrency bound: {}", config.crawler.max_concurrent_requests);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, StorageConfig, UserAgentConfig, DEFAULT_LINK_BLOCKLIST,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate;
