//! Recrawler: a polite, priority-aware web crawler
//!
//! This crate implements the crawl frontier and scheduling engine: URL
//! normalization and deduplication, two-tier priority queueing, per-domain
//! politeness buffering, bounded global concurrency, and the feedback loop
//! that turns a page's classified site type into the recrawl priority of the
//! links it discovered.

pub mod config;
pub mod crawler;
pub mod logging;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Recrawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Fetch failed for {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("Unsupported content type for {url}: {content_type}")]
    UnsupportedContent { url: String, content_type: String },

    #[error("Extraction failed for {url}: {message}")]
    ExtractionFailure { url: String, message: String },

    #[error("Failed to persist {url}: {source}")]
    Persistence {
        url: String,
        source: storage::StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl CrawlerError {
    /// Short, stable label for the failure category, used in job outcomes and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::FetchFailure { .. } => "fetch_failure",
            Self::UnsupportedContent { .. } => "unsupported_content",
            Self::ExtractionFailure { .. } => "extraction_failure",
            Self::Persistence { .. } => "persistence_failure",
            Self::Storage(_) => "storage",
            Self::HttpClient(_) => "http_client",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Recrawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlJob, Crawler};
pub use state::JobStage;
pub use url::{extract_domain, normalize_url};
