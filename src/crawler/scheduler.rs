//! Crawl frontier: admission, politeness routing and queue tiering
//!
//! This module handles:
//! - The deduplication gate every URL passes exactly once
//! - Routing admitted URLs through the per-domain politeness buffer
//! - Mapping recrawl priorities onto the two job queue tiers
//! - Pulling the next job, high tier first

use crate::crawler::Priority;
use crate::state::PolitenessBuffer;
use crate::storage::{CrawlJob, DedupStore, JobQueue, QueueTier, StorageResult};
use crate::url::{extract_domain, normalize_url, parse_crawlable};
use crate::{CrawlerError, UrlError};
use std::sync::Arc;
use url::Url;

/// Where an admitted URL went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// Pushed onto a job queue tier
    Enqueued(QueueTier),

    /// Held behind an in-flight job for the same domain
    Buffered,
}

/// The crawl frontier shared by every pipeline on a worker
///
/// The dedup store and job queue may be shared with other worker processes;
/// the politeness buffer belongs to this instance alone.
pub struct Frontier {
    dedup: Arc<dyn DedupStore>,
    queue: Arc<dyn JobQueue>,
    politeness: PolitenessBuffer,
}

impl Frontier {
    /// Creates a frontier over the given stores
    pub fn new(dedup: Arc<dyn DedupStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            dedup,
            queue,
            politeness: PolitenessBuffer::new(),
        }
    }

    /// Normalizes `raw` and records it in the dedup store
    ///
    /// # Returns
    ///
    /// * `Ok(Some(url))` - This call admitted the URL
    /// * `Ok(None)` - The URL had been admitted before
    /// * `Err(CrawlerError::InvalidUrl)` - The URL cannot be normalized, is
    ///   not HTTP(S), or has no host
    /// * `Err(CrawlerError::Storage)` - The dedup store failed
    pub fn admit(&self, raw: &str) -> Result<Option<Url>, CrawlerError> {
        let url = parse_crawlable(raw)?;
        if self.dedup.add_if_absent(url.as_str())? {
            Ok(Some(url))
        } else {
            Ok(None)
        }
    }

    /// Admits a URL if it was never seen before
    ///
    /// Returns true iff this call caused the admission. Unparseable and
    /// non-HTTP(S) URLs are rejected without touching the store.
    pub fn try_admit(&self, raw: &str) -> bool {
        match self.admit(raw) {
            Ok(admitted) => admitted.is_some(),
            Err(CrawlerError::InvalidUrl(e)) => {
                tracing::debug!("Rejected {}: {}", raw, e);
                false
            }
            Err(e) => {
                tracing::warn!("Dedup store failed while admitting {}: {}", raw, e);
                false
            }
        }
    }

    /// Routes an admitted URL to the queue tier for `priority`
    ///
    /// If this worker has a job in flight for the URL's domain, the URL is
    /// buffered instead and released when that job completes.
    pub fn schedule(&self, url: &Url, priority: Priority) -> StorageResult<Scheduled> {
        if let Some(domain) = extract_domain(url) {
            if self.politeness.buffer_if_in_flight(&domain, url.as_str()) {
                tracing::debug!("Buffered {} behind in-flight job on {}", url, domain);
                return Ok(Scheduled::Buffered);
            }
        }

        let tier = priority.queue_tier();
        self.queue.enqueue(tier, &CrawlJob::new(url.as_str()))?;
        Ok(Scheduled::Enqueued(tier))
    }

    /// Admits and schedules a discovered link
    ///
    /// Returns `Ok(None)` when the link was already known.
    pub fn admit_and_schedule(
        &self,
        raw: &str,
        priority: Priority,
    ) -> Result<Option<Scheduled>, CrawlerError> {
        match self.admit(raw)? {
            Some(url) => Ok(Some(self.schedule(&url, priority)?)),
            None => Ok(None),
        }
    }

    /// Admits a seed URL straight onto the high tier
    ///
    /// Seeds must be HTTP(S) URLs with a host. Returns false if the seed had
    /// already been admitted.
    pub fn seed(&self, raw: &str) -> Result<bool, CrawlerError> {
        let url = parse_crawlable(raw)?;
        if !self.dedup.add_if_absent(url.as_str())? {
            return Ok(false);
        }

        self.queue
            .enqueue(QueueTier::High, &CrawlJob::new(url.as_str()))?;
        tracing::info!("Seeded {}", url);
        Ok(true)
    }

    /// Clears a URL's dedup record so it can be admitted again
    pub fn forget(&self, raw: &str) -> Result<bool, CrawlerError> {
        let url = normalize_url(raw)?;
        Ok(self.dedup.remove(url.as_str())?)
    }

    /// Pulls the next job, draining the high tier first
    pub fn next_job(&self) -> StorageResult<Option<CrawlJob>> {
        for tier in QueueTier::DRAIN_ORDER {
            if let Some(job) = self.queue.dequeue(tier)? {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Marks the job's domain in flight before its pipeline starts
    ///
    /// # Returns
    ///
    /// * `Ok(Some(domain))` - The caller may process the job and must call
    ///   [`Frontier::complete`] for `domain` afterwards
    /// * `Ok(None)` - The domain is busy on this worker; the job waits in the
    ///   domain's local run queue and is handed to whoever holds the domain
    ///   when it calls [`Frontier::complete`]
    /// * `Err(UrlError)` - The job's URL has no host
    pub fn begin(&self, job: &CrawlJob) -> Result<Option<String>, UrlError> {
        let url = Url::parse(&job.current_url).map_err(|e| UrlError::Parse(e.to_string()))?;
        let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;

        if self.politeness.begin(&domain, &job.current_url) {
            Ok(Some(domain))
        } else {
            tracing::debug!(
                "Deferred {}: {} already has a job in flight ({} waiting)",
                job.current_url,
                domain,
                self.politeness.deferred_len(&domain)
            );
            Ok(None)
        }
    }

    /// Finishes the domain's in-flight job and enqueues its discovered batch
    ///
    /// The batch goes to the tier of `priority`, the recrawl priority decided
    /// for the page that just completed. If a job was deferred behind this
    /// one it is returned, and the domain stays in flight for the caller to
    /// run it next.
    pub fn complete(&self, domain: &str, priority: Priority) -> Option<CrawlJob> {
        let release = self.politeness.finish(domain);
        self.release(domain, release.batch, priority.queue_tier());
        release.next.map(|url| CrawlJob::new(&url))
    }

    /// Gives up a domain without running its deferred jobs
    ///
    /// Everything still held for the domain goes back to the low tier so
    /// another pipeline can pick it up. Returns the number of URLs enqueued.
    pub fn abandon(&self, domain: &str) -> usize {
        let held = self.politeness.abandon(domain);
        if !held.is_empty() {
            tracing::warn!("Returning {} held URLs for {} to the queue", held.len(), domain);
        }
        self.release(domain, held, QueueTier::Low)
    }

    fn release(&self, domain: &str, urls: Vec<String>, tier: QueueTier) -> usize {
        let mut released = 0;
        for url in urls {
            match self.queue.enqueue(tier, &CrawlJob::new(&url)) {
                Ok(()) => released += 1,
                Err(e) => tracing::error!("Failed to release buffered {}: {}", url, e),
            }
        }

        if released > 0 {
            tracing::debug!("Released {} buffered URLs for {} to {}", released, domain, tier);
        }
        released
    }

    /// Number of jobs waiting in a tier
    pub fn depth(&self, tier: QueueTier) -> StorageResult<u64> {
        self.queue.depth(tier)
    }

    /// The per-worker politeness buffer
    pub fn politeness(&self) -> &PolitenessBuffer {
        &self.politeness
    }
}
