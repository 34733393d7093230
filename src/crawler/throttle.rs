//! Global concurrency limit for crawl pipelines
//!
//! Every fetch-and-process pipeline holds one permit for its whole duration.
//! Permits are owned and released on drop, so early returns and panics in a
//! pipeline cannot leak capacity.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many pipelines run at once on this worker
#[derive(Debug, Clone)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl Throttler {
    /// Creates a throttler admitting at most `limit` pipelines
    ///
    /// A limit of zero is raised to one so the worker can make progress.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `None` only if the semaphore was closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }

    /// Free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held by running pipelines
    pub fn in_flight(&self) -> usize {
        self.limit - self.available()
    }

    /// The configured maximum
    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_limit_is_raised() {
        let throttler = Throttler::new(0);
        assert_eq!(throttler.limit(), 1);
        assert_eq!(throttler.available(), 1);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let throttler = Throttler::new(2);

        let first = throttler.acquire().await.unwrap();
        let second = throttler.acquire().await.unwrap();
        assert_eq!(throttler.in_flight(), 2);
        assert_eq!(throttler.available(), 0);

        drop(first);
        assert_eq!(throttler.available(), 1);
        drop(second);
        assert_eq!(throttler.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_when_task_fails() {
        let throttler = Throttler::new(1);
        let permit = throttler.acquire().await.unwrap();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            Err::<(), &str>("pipeline failed")
        });
        assert!(handle.await.unwrap().is_err());

        assert_eq!(throttler.available(), 1);
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let throttler = Throttler::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let permit = throttler.acquire().await.unwrap();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(throttler.available(), 3);
    }
}
