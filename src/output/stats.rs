//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying the
//! state of a frontier from its stores.

use crate::crawler::SiteType;
use crate::storage::{DedupStore, JobQueue, PageStore, QueueTier, StorageResult};

/// Frontier statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierStatistics {
    /// URLs ever admitted (dedup records)
    pub admitted_urls: u64,

    /// Jobs waiting in the high tier
    pub high_queue_depth: u64,

    /// Jobs waiting in the low tier
    pub low_queue_depth: u64,

    /// Page records in the document store
    pub stored_pages: u64,

    /// Stored pages per site type, in label order
    pub pages_by_site_type: Vec<(SiteType, u64)>,
}

impl FrontierStatistics {
    /// Jobs waiting in either tier
    pub fn queued_jobs(&self) -> u64 {
        self.high_queue_depth + self.low_queue_depth
    }
}

/// Loads statistics from the three stores
///
/// # Returns
///
/// * `Ok(FrontierStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - A store query failed
pub fn load_statistics(
    dedup: &dyn DedupStore,
    queue: &dyn JobQueue,
    pages: &dyn PageStore,
) -> StorageResult<FrontierStatistics> {
    let mut pages_by_site_type = Vec::new();
    for site_type in SiteType::all() {
        pages_by_site_type.push((site_type, pages.count_pages_by_site_type(site_type)?));
    }

    Ok(FrontierStatistics {
        admitted_urls: dedup.count()?,
        high_queue_depth: queue.depth(QueueTier::High)?,
        low_queue_depth: queue.depth(QueueTier::Low)?,
        stored_pages: pages.count_pages()?,
        pages_by_site_type,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &FrontierStatistics) {
    println!("=== Frontier Statistics ===\n");

    println!("Overview:");
    println!("  Admitted URLs: {}", stats.admitted_urls);
    println!("  Stored pages: {}", stats.stored_pages);
    println!();

    println!("Job Queues:");
    println!("  high: {}", stats.high_queue_depth);
    println!("  low: {}", stats.low_queue_depth);
    println!();

    if stats.stored_pages > 0 {
        println!("Pages by Site Type:");
        for (site_type, count) in &stats.pages_by_site_type {
            let percentage = (*count as f64 / stats.stored_pages as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", site_type, count, percentage);
        }
        println!();
    }

    // Admitted URLs that are neither queued nor stored were dropped or are in flight
    let unaccounted = stats
        .admitted_urls
        .saturating_sub(stats.stored_pages + stats.queued_jobs());
    println!(
        "Admitted but not stored or queued: {} (failed, deferred or in flight)",
        unaccounted
    );
}
