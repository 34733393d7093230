//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing, link filtering and page data extraction
//! - Site-type classification and recrawl priority mapping
//! - The frontier (dedup gate, politeness routing, queue tiers)
//! - The throttler bounding concurrent pipelines
//! - The orchestrator running the per-job pipeline

mod classifier;
mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod throttle;

pub use classifier::{
    adjust_priority, classify_site_type, recrawl_priority, Priority, SiteType,
};
pub use coordinator::{Crawler, Handled, JobOutcome};
pub use fetcher::{
    build_http_client, FetchResponse, Fetcher, HttpFetcher, ERROR_STATUS_CUTOFF, MAX_REDIRECTS,
};
pub use parser::{extract_page, ExtractedPage, LinkExtractor};
pub use scheduler::{Frontier, Scheduled};
pub use throttle::Throttler;

pub use crate::storage::CrawlJob;
