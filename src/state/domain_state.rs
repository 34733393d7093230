use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tracks the politeness state of one domain on this worker
///
/// An entry exists only while the domain has a job in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DomainEntry {
    /// Links discovered while the domain was busy, oldest first
    pending: VecDeque<String>,

    /// Pulled jobs waiting to run after the in-flight one, oldest first
    deferred: VecDeque<String>,
}

impl DomainEntry {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            deferred: VecDeque::new(),
        }
    }
}

/// What a finished job hands back for its domain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainRelease {
    /// Links buffered during the job, to be enqueued as one batch
    pub batch: Vec<String>,

    /// The next deferred job for the domain; when present the domain stays
    /// in flight and the caller runs this job itself
    pub next: Option<String>,
}

/// Per-worker politeness buffer
///
/// Keeps at most one job per domain in flight on this worker. Links for a
/// domain discovered while its job is running are held here and handed back
/// as one batch when that job completes. Jobs pulled from the queue for a
/// busy domain wait in a local run queue and are run one after another by the
/// worker holding the domain, so they never go back to the shared queue.
///
/// This is process-local: several worker processes may each have a job in
/// flight for the same domain.
#[derive(Debug, Default)]
pub struct PolitenessBuffer {
    entries: Mutex<HashMap<String, DomainEntry>>,
}

impl PolitenessBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, DomainEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `domain` in flight for a job on `url`
    ///
    /// # Returns
    ///
    /// * `true` - The domain was idle; the caller owns the in-flight slot
    /// * `false` - Another job for the domain is running; `url` joins the
    ///   domain's run queue and is returned by [`PolitenessBuffer::finish`]
    pub fn begin(&self, domain: &str, url: &str) -> bool {
        let mut entries = self.entries();
        match entries.get_mut(domain) {
            Some(entry) => {
                entry.deferred.push_back(url.to_string());
                false
            }
            None => {
                entries.insert(domain.to_string(), DomainEntry::new());
                true
            }
        }
    }

    /// Buffers a discovered `url` if its domain has a job in flight
    ///
    /// # Returns
    ///
    /// * `true` - The URL was buffered
    /// * `false` - The domain is idle; the caller should enqueue the URL now
    pub fn buffer_if_in_flight(&self, domain: &str, url: &str) -> bool {
        match self.entries().get_mut(domain) {
            Some(entry) => {
                entry.pending.push_back(url.to_string());
                true
            }
            None => false,
        }
    }

    /// Finishes the domain's in-flight job
    ///
    /// Drains the discovered batch. If jobs were deferred behind this one the
    /// oldest is handed over and the domain stays in flight; otherwise the
    /// domain becomes idle.
    pub fn finish(&self, domain: &str) -> DomainRelease {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(domain) else {
            return DomainRelease::default();
        };

        let batch = entry.pending.drain(..).collect();
        let next = entry.deferred.pop_front();
        if next.is_none() {
            entries.remove(domain);
        }

        DomainRelease { batch, next }
    }

    /// Gives up the domain, returning every URL still held for it
    ///
    /// Discovered links come first, then deferred jobs.
    pub fn abandon(&self, domain: &str) -> Vec<String> {
        match self.entries().remove(domain) {
            Some(entry) => entry.pending.into_iter().chain(entry.deferred).collect(),
            None => Vec::new(),
        }
    }

    /// Returns true if a job for the domain is running on this worker
    pub fn is_in_flight(&self, domain: &str) -> bool {
        self.entries().contains_key(domain)
    }

    /// Number of discovered links waiting behind the domain's in-flight job
    pub fn pending_len(&self, domain: &str) -> usize {
        self.entries()
            .get(domain)
            .map(|entry| entry.pending.len())
            .unwrap_or(0)
    }

    /// Number of pulled jobs waiting to run after the domain's in-flight job
    pub fn deferred_len(&self, domain: &str) -> usize {
        self.entries()
            .get(domain)
            .map(|entry| entry.deferred.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn domain_count(&self) -> usize {
        self.entries().len()
    }
}
