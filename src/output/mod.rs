//! Output module for reporting crawl state
//!
//! This module handles:
//! - Loading and printing frontier statistics from the stores
//! - Summarizing the jobs a bounded crawl handled

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, FrontierStatistics};
pub use summary::{print_summary, CrawlSummary};
