//! Storage traits and error types
//!
//! This module defines the collaborator interfaces the crawl engine depends on.
//! All operations take `&self`; implementations synchronize internally so a
//! single instance can be shared by every pipeline on a worker.

use crate::crawler::SiteType;
use crate::storage::{CrawlJob, PageRecord, QueueTier};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Set of normalized URLs already admitted to the frontier
///
/// Implementations must make `add_if_absent` atomic: when several callers add
/// the same key concurrently, exactly one of them observes `true`.
pub trait DedupStore: Send + Sync {
    /// Records `key` if it is not present yet
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - This call added the key
    /// * `Ok(false)` - The key was already recorded
    fn add_if_absent(&self, key: &str) -> StorageResult<bool>;

    /// Checks whether `key` has been recorded
    fn contains(&self, key: &str) -> StorageResult<bool>;

    /// Removes a record so the URL can be admitted again
    ///
    /// Returns true if a record was removed.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Number of recorded keys
    fn count(&self) -> StorageResult<u64>;
}

/// Durable two-tier queue of crawl jobs
///
/// Each enqueued job is delivered to exactly one `dequeue` caller, FIFO within
/// a tier.
pub trait JobQueue: Send + Sync {
    /// Appends a job to the given tier
    fn enqueue(&self, tier: QueueTier, job: &CrawlJob) -> StorageResult<()>;

    /// Removes and returns the oldest job of the given tier, if any
    fn dequeue(&self, tier: QueueTier) -> StorageResult<Option<CrawlJob>>;

    /// Number of jobs waiting in the given tier
    fn depth(&self, tier: QueueTier) -> StorageResult<u64>;
}

/// Document store for crawled pages
pub trait PageStore: Send + Sync {
    /// Inserts the record or replaces the one with the same URL
    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts stored pages classified as `site_type`
    fn count_pages_by_site_type(&self, site_type: SiteType) -> StorageResult<u64>;
}
