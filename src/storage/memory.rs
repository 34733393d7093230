//! In-memory storage implementation
//!
//! Mutex-guarded collections implementing the storage traits. Everything is
//! lost when the process exits, so this backend only suits single-process
//! crawls and tests.

use crate::crawler::SiteType;
use crate::storage::traits::{DedupStore, JobQueue, PageStore, StorageError, StorageResult};
use crate::storage::{CrawlJob, PageRecord, QueueTier};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    seen: Mutex<HashSet<String>>,
    queues: Mutex<HashMap<QueueTier, VecDeque<CrawlJob>>>,
    pages: Mutex<HashMap<String, PageRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| StorageError::LockPoisoned)
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs waiting in a tier, oldest first
    #[cfg(test)]
    pub(crate) fn queued_urls(&self, tier: QueueTier) -> StorageResult<Vec<String>> {
        let queues = lock(&self.queues)?;
        Ok(queues
            .get(&tier)
            .map(|queue| queue.iter().map(|job| job.current_url.clone()).collect())
            .unwrap_or_default())
    }
}

impl DedupStore for MemoryStorage {
    fn add_if_absent(&self, key: &str) -> StorageResult<bool> {
        Ok(lock(&self.seen)?.insert(key.to_string()))
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(lock(&self.seen)?.contains(key))
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        Ok(lock(&self.seen)?.remove(key))
    }

    fn count(&self) -> StorageResult<u64> {
        Ok(lock(&self.seen)?.len() as u64)
    }
}

impl JobQueue for MemoryStorage {
    fn enqueue(&self, tier: QueueTier, job: &CrawlJob) -> StorageResult<()> {
        lock(&self.queues)?
            .entry(tier)
            .or_default()
            .push_back(job.clone());
        Ok(())
    }

    fn dequeue(&self, tier: QueueTier) -> StorageResult<Option<CrawlJob>> {
        Ok(lock(&self.queues)?
            .get_mut(&tier)
            .and_then(|queue| queue.pop_front()))
    }

    fn depth(&self, tier: QueueTier) -> StorageResult<u64> {
        Ok(lock(&self.queues)?
            .get(&tier)
            .map(|queue| queue.len() as u64)
            .unwrap_or(0))
    }
}

impl PageStore for MemoryStorage {
    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()> {
        lock(&self.pages)?.insert(page.url.clone(), page.clone());
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        Ok(lock(&self.pages)?.get(url).cloned())
    }

    fn count_pages(&self) -> StorageResult<u64> {
        Ok(lock(&self.pages)?.len() as u64)
    }

    fn count_pages_by_site_type(&self, site_type: SiteType) -> StorageResult<u64> {
        Ok(lock(&self.pages)?
            .values()
            .filter(|page| page.site_type == site_type)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_if_absent_once() {
        let storage = MemoryStorage::new();
        assert!(storage.add_if_absent("https://a.com/").unwrap());
        assert!(!storage.add_if_absent("https://a.com/").unwrap());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_add_exactly_one_wins() {
        let storage = Arc::new(MemoryStorage::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || storage.add_if_absent("https://a.com/x").unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_queue_tiers_are_independent() {
        let storage = MemoryStorage::new();
        storage
            .enqueue(QueueTier::High, &CrawlJob::new("https://a.com/h"))
            .unwrap();
        storage
            .enqueue(QueueTier::Low, &CrawlJob::new("https://a.com/l1"))
            .unwrap();
        storage
            .enqueue(QueueTier::Low, &CrawlJob::new("https://a.com/l2"))
            .unwrap();

        assert_eq!(
            storage.queued_urls(QueueTier::Low).unwrap(),
            vec!["https://a.com/l1", "https://a.com/l2"]
        );
        assert_eq!(storage.depth(QueueTier::High).unwrap(), 1);

        let job = storage.dequeue(QueueTier::Low).unwrap().unwrap();
        assert_eq!(job.current_url, "https://a.com/l1");
        assert_eq!(storage.depth(QueueTier::Low).unwrap(), 1);
    }

    #[test]
    fn test_dequeue_empty_tier() {
        let storage = MemoryStorage::new();
        assert!(storage.dequeue(QueueTier::High).unwrap().is_none());
        assert_eq!(storage.depth(QueueTier::High).unwrap(), 0);
    }
}
