//! Storage module for the crawler's shared state
//!
//! This module defines the three collaborators the crawl engine shares between
//! workers and the records that flow through them:
//! - The deduplication store (URLs already admitted to the frontier)
//! - The two-tier job queue (`high` and `low`)
//! - The page document store (one upserted record per crawled URL)
//!
//! Two backends implement all three: SQLite (durable, safe for several worker
//! processes sharing one database file) and in-memory (single process).

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{DedupStore, JobQueue, PageStore, StorageError, StorageResult};

use crate::crawler::SiteType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A unit of crawl work
///
/// Jobs are immutable once enqueued and consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlJob {
    /// The URL the job was created for
    pub base_url: String,

    /// The normalized URL to fetch
    pub current_url: String,
}

impl CrawlJob {
    /// Creates a job for a normalized URL
    pub fn new(url: &str) -> Self {
        Self {
            base_url: url.to_string(),
            current_url: url.to_string(),
        }
    }
}

/// The two job queue tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueTier {
    High,
    Low,
}

impl QueueTier {
    /// Tiers in the order workers drain them
    pub const DRAIN_ORDER: [QueueTier; 2] = [QueueTier::High, QueueTier::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for QueueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image referenced by a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

/// A product name and its displayed price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub name: String,
    pub price: String,
}

/// Represents a crawled page in the document store
///
/// Keyed by `url`; a recrawl replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: BTreeSet<String>,
    pub site_type: SiteType,
    pub content: String,
    pub images: Vec<ImageRef>,
    pub videos: Vec<String>,
    pub price: Vec<ProductPrice>,
    pub crawled_at: DateTime<Utc>,
}
