//! Crawl orchestration
//!
//! This module contains the per-job pipeline and the worker loops that drive
//! it:
//! - Pulling jobs from the frontier, high tier first
//! - Gating pipelines through the throttler
//! - Holding each domain in flight for the duration of its job
//! - Fetch, validate, extract, classify, persist, re-enqueue

use crate::config::{Config, CrawlerConfig};
use crate::crawler::classifier::{classify_site_type, recrawl_priority, Priority, SiteType};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::parser::{extract_page, LinkExtractor};
use crate::crawler::scheduler::Frontier;
use crate::crawler::throttle::Throttler;
use crate::output::CrawlSummary;
use crate::state::JobStage;
use crate::storage::{CrawlJob, DedupStore, JobQueue, PageStore, SqliteStorage};
use crate::{CrawlerError, UrlError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// What happened to one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// The job's URL
    pub url: String,

    /// Terminal stage: `Done` or `Failed`
    pub stage: JobStage,

    /// The stage that was running when the job failed
    pub failed_at: Option<JobStage>,

    /// Error category of a failed job (see [`CrawlerError::kind`])
    pub error_kind: Option<&'static str>,

    /// Site type assigned to the page, once classified
    pub site_type: Option<SiteType>,

    /// Recrawl priority given to the page's links, once classified
    pub priority: Option<Priority>,

    /// Links this job admitted to the frontier
    pub links_admitted: usize,

    /// Whether the page record was written
    pub persisted: bool,
}

impl JobOutcome {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            stage: JobStage::START,
            failed_at: None,
            error_kind: None,
            site_type: None,
            priority: None,
            links_admitted: 0,
            persisted: false,
        }
    }

    /// Whether the pipeline ran to completion
    pub fn is_success(&self) -> bool {
        self.stage.is_success()
    }
}

/// What a worker did with one pulled job
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// The job ran, followed by any same-domain jobs deferred behind it on
    /// this worker, in the order they ran
    Ran(Vec<JobOutcome>),

    /// Another job for the domain is running on this worker; this one waits
    /// in the domain's run queue and runs after it
    Deferred,
}

impl Handled {
    /// The outcomes of every job that ran, empty when deferred
    pub fn into_outcomes(self) -> Vec<JobOutcome> {
        match self {
            Self::Ran(outcomes) => outcomes,
            Self::Deferred => Vec::new(),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred)
    }
}

/// Keeps a domain in flight until its run queue is exhausted
///
/// If dropped while still holding the domain (the pipeline panicked), every
/// URL held for the domain goes back to the shared queue.
struct InFlight<'a> {
    frontier: &'a Frontier,
    domain: String,
    held: bool,
}

impl InFlight<'_> {
    /// Completes the current job, returning the next deferred one
    fn complete(&mut self, priority: Priority) -> Option<CrawlJob> {
        let next = self.frontier.complete(&self.domain, priority);
        self.held = next.is_some();
        next
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.held {
            self.frontier.abandon(&self.domain);
        }
    }
}

/// The crawl orchestrator for one worker
///
/// Owns its frontier view, throttler and politeness state, so several
/// independent crawlers can live in one process.
pub struct Crawler {
    config: CrawlerConfig,
    frontier: Frontier,
    throttler: Throttler,
    pages: Arc<dyn PageStore>,
    fetcher: Arc<dyn Fetcher>,
    extractor: LinkExtractor,
}

impl Crawler {
    /// Creates a crawler over explicit collaborators
    pub fn new(
        config: &Config,
        dedup: Arc<dyn DedupStore>,
        queue: Arc<dyn JobQueue>,
        pages: Arc<dyn PageStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config: config.crawler.clone(),
            frontier: Frontier::new(dedup, queue),
            throttler: Throttler::new(config.crawler.max_concurrent_requests as usize),
            pages,
            fetcher,
            extractor: LinkExtractor::new(&config.crawler.link_blocklist),
        }
    }

    /// Creates a crawler whose three stores are one backend
    pub fn with_storage<S>(config: &Config, storage: Arc<S>, fetcher: Arc<dyn Fetcher>) -> Self
    where
        S: DedupStore + JobQueue + PageStore + 'static,
    {
        Self::new(config, storage.clone(), storage.clone(), storage, fetcher)
    }

    /// Creates a crawler backed by the configured SQLite database and HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to seed or run
    /// * `Err(CrawlerError)` - The database could not be opened or the HTTP
    ///   client could not be built
    pub fn from_config(config: &Config) -> Result<Self, CrawlerError> {
        let storage = Arc::new(SqliteStorage::new(Path::new(
            &config.storage.database_path,
        ))?);
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let fetcher = Arc::new(HttpFetcher::from_config(&config.user_agent, timeout)?);

        Ok(Self::with_storage(config, storage, fetcher))
    }

    /// Admits a seed URL onto the high tier
    ///
    /// Returns false if the seed had been admitted before.
    pub fn seed(&self, url: &str) -> Result<bool, CrawlerError> {
        self.frontier.seed(url)
    }

    /// Admits a URL if it was never seen before
    pub fn try_admit(&self, url: &str) -> bool {
        self.frontier.try_admit(url)
    }

    /// Clears a URL's dedup record so a failed page can be crawled again
    pub fn forget(&self, url: &str) -> Result<bool, CrawlerError> {
        self.frontier.forget(url)
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    /// Runs one job through the pipeline
    ///
    /// Every failure is caught here: the job ends in `Failed` and the error is
    /// logged. Nothing a single page does can stop the worker.
    pub async fn process_job(&self, job: &CrawlJob) -> JobOutcome {
        let mut outcome = JobOutcome::new(&job.current_url);

        match self.run_pipeline(job, &mut outcome).await {
            Ok(()) => {
                outcome.stage = JobStage::Done;
                tracing::info!(
                    "Crawled {} as {} ({} priority, {} new links)",
                    outcome.url,
                    outcome.site_type.unwrap_or(SiteType::Other),
                    outcome.priority.unwrap_or_default(),
                    outcome.links_admitted
                );
            }
            Err(e) => {
                let failed_at = outcome.stage;
                outcome.failed_at = Some(failed_at);
                outcome.error_kind = Some(e.kind());
                outcome.stage = JobStage::Failed;
                tracing::warn!("Dropped {} while {}: {}", outcome.url, failed_at, e);
            }
        }

        outcome
    }

    async fn run_pipeline(
        &self,
        job: &CrawlJob,
        outcome: &mut JobOutcome,
    ) -> Result<(), CrawlerError> {
        outcome.stage = JobStage::Fetching;
        let url = Url::parse(&job.current_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        let response = self.fetcher.fetch(&url).await?;
        if !response.is_success() {
            return Err(CrawlerError::FetchFailure {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        outcome.stage = JobStage::Validating;
        if !response.is_html() {
            return Err(CrawlerError::UnsupportedContent {
                url: url.to_string(),
                content_type: response.content_type().unwrap_or("none").to_string(),
            });
        }

        outcome.stage = JobStage::Extracting;
        // Relative links belong to wherever the redirects ended up
        let page = extract_page(&response.body, &response.final_url, &self.extractor)?;

        outcome.stage = JobStage::Classifying;
        let site_type = classify_site_type(&page.keywords, &page.description);
        let priority = recrawl_priority(
            site_type,
            self.config.update_frequency,
            self.config.importance,
        );
        outcome.site_type = Some(site_type);
        outcome.priority = Some(priority);

        outcome.stage = JobStage::Persisting;
        let record = page.to_record(url.as_str(), site_type);
        match self.pages.upsert_page(&record) {
            Ok(()) => outcome.persisted = true,
            Err(source) => {
                // Frontier progress must not depend on the document store
                let error = CrawlerError::Persistence {
                    url: url.to_string(),
                    source,
                };
                tracing::warn!("{}", error);
            }
        }

        outcome.stage = JobStage::Reenqueuing;
        for link in &page.links {
            match self.frontier.admit_and_schedule(link.as_str(), priority) {
                Ok(Some(_)) => outcome.links_admitted += 1,
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to schedule {} from {}: {}", link, url, e),
            }
        }

        Ok(())
    }

    /// Runs a pulled job with its domain held in flight
    ///
    /// If another job for the same domain is running on this worker the job
    /// is deferred behind it. Otherwise this call also runs every job deferred
    /// behind this one, one at a time, before giving the domain up. Links
    /// discovered by each job are released as one batch when it finishes.
    pub async fn handle_job(&self, job: CrawlJob) -> Handled {
        let domain = match self.frontier.begin(&job) {
            Ok(Some(domain)) => domain,
            Ok(None) => return Handled::Deferred,
            Err(e) => {
                tracing::debug!("No domain for {}: {}", job.current_url, e);
                return Handled::Ran(vec![self.process_job(&job).await]);
            }
        };

        let mut in_flight = InFlight {
            frontier: &self.frontier,
            domain,
            held: true,
        };
        let mut outcomes = Vec::new();
        let mut next = Some(job);

        while let Some(job) = next {
            let outcome = self.process_job(&job).await;
            // A failed page's buffered links go to the low tier
            let priority = match outcome.priority {
                Some(priority) if outcome.is_success() => priority,
                _ => Priority::Low,
            };
            next = in_flight.complete(priority);
            outcomes.push(outcome);
        }

        Handled::Ran(outcomes)
    }

    /// Runs the open-ended worker loop
    ///
    /// Waits for a throttle slot, pulls the next job and spawns its pipeline
    /// holding that slot. Sleeps for the idle poll interval whenever both
    /// queues are empty. Only returns if the throttler is closed.
    pub async fn run(self: Arc<Self>) {
        let idle = Duration::from_millis(self.config.idle_poll_ms);
        tracing::info!(
            "Worker started with {} concurrent pipelines",
            self.throttler.limit()
        );

        while let Some(permit) = self.throttler.acquire().await {
            match self.frontier.next_job() {
                Ok(Some(job)) => {
                    let crawler = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        crawler.handle_job(job).await;
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::time::sleep(idle).await;
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!("Failed to pull a job: {}", e);
                    tokio::time::sleep(idle).await;
                }
            }
        }

        tracing::info!("Worker stopped");
    }

    /// Crawls until both queues are empty and no pipeline is running
    ///
    /// Uses the same scheduling as [`Crawler::run`] and returns a summary of
    /// every job it handled.
    pub async fn run_until_idle(self: &Arc<Self>) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        let mut tasks: JoinSet<Handled> = JoinSet::new();

        while let Some(permit) = self.throttler.acquire().await {
            match self.frontier.next_job() {
                Ok(Some(job)) => {
                    let crawler = Arc::clone(self);
                    tasks.spawn(async move {
                        let _permit = permit;
                        crawler.handle_job(job).await
                    });
                }
                Ok(None) => {
                    drop(permit);
                    // A running pipeline may still enqueue or release work
                    match tasks.join_next().await {
                        Some(result) => summary.record_join(result),
                        None => break,
                    }
                }
                Err(e) => {
                    drop(permit);
                    tracing::error!("Failed to pull a job: {}", e);
                    break;
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            summary.record_join(result);
        }

        tracing::info!(
            "Crawl idle: {} jobs finished ({} failed), {} deferred",
            summary.jobs_finished(),
            summary.jobs_failed,
            summary.jobs_deferred
        );
        summary
    }
}
