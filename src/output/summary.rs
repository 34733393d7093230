//! Summary of the jobs a worker handled

use crate::crawler::{Handled, JobOutcome, SiteType};
use std::collections::{BTreeMap, HashMap};
use tokio::task::JoinError;

/// Summary statistics for a bounded crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Jobs that ran to `Done`
    pub jobs_done: u64,

    /// Jobs that ended in `Failed`
    pub jobs_failed: u64,

    /// Jobs that waited behind another job for the same domain
    pub jobs_deferred: u64,

    /// Pipelines that panicked
    pub jobs_panicked: u64,

    /// Links admitted to the frontier by all jobs
    pub links_admitted: u64,

    /// Page records written
    pub pages_persisted: u64,

    /// Failed jobs per error kind
    pub failures_by_kind: BTreeMap<&'static str, u64>,

    /// Completed jobs per site type
    pub pages_by_site_type: HashMap<SiteType, u64>,
}

impl CrawlSummary {
    /// Adds one job outcome
    pub fn record(&mut self, outcome: &JobOutcome) {
        if outcome.is_success() {
            self.jobs_done += 1;
        } else {
            self.jobs_failed += 1;
            if let Some(kind) = outcome.error_kind {
                *self.failures_by_kind.entry(kind).or_insert(0) += 1;
            }
        }

        if let (true, Some(site_type)) = (outcome.is_success(), outcome.site_type) {
            *self.pages_by_site_type.entry(site_type).or_insert(0) += 1;
        }

        self.links_admitted += outcome.links_admitted as u64;
        if outcome.persisted {
            self.pages_persisted += 1;
        }
    }

    /// Adds the result of a joined pipeline task
    pub fn record_join(&mut self, result: Result<Handled, JoinError>) {
        match result {
            Ok(Handled::Ran(outcomes)) => {
                for outcome in &outcomes {
                    self.record(outcome);
                }
            }
            Ok(Handled::Deferred) => self.jobs_deferred += 1,
            Err(e) => {
                tracing::error!("Pipeline task failed: {}", e);
                self.jobs_panicked += 1;
            }
        }
    }

    /// Jobs that reached a terminal stage
    pub fn jobs_finished(&self) -> u64 {
        self.jobs_done + self.jobs_failed
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!("  Jobs done: {}", summary.jobs_done);
    println!("  Jobs failed: {}", summary.jobs_failed);
    println!("  Jobs deferred: {}", summary.jobs_deferred);
    if summary.jobs_panicked > 0 {
        println!("  Pipelines panicked: {}", summary.jobs_panicked);
    }
    println!("  Links admitted: {}", summary.links_admitted);
    println!("  Pages persisted: {}", summary.pages_persisted);

    if !summary.failures_by_kind.is_empty() {
        println!("\nFailures:");
        for (kind, count) in &summary.failures_by_kind {
            println!("  {}: {}", kind, count);
        }
    }

    if !summary.pages_by_site_type.is_empty() {
        println!("\nPages by Site Type:");
        let mut counts: Vec<_> = summary.pages_by_site_type.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        for (site_type, count) in counts {
            println!("  {}: {}", site_type, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::Priority;
    use crate::state::JobStage;

    fn outcome(stage: JobStage) -> JobOutcome {
        JobOutcome {
            url: "https://a.com/".to_string(),
            stage,
            failed_at: None,
            error_kind: None,
            site_type: None,
            priority: None,
            links_admitted: 0,
            persisted: false,
        }
    }

    #[test]
    fn test_record_outcomes() {
        let mut summary = CrawlSummary::default();

        let mut done = outcome(JobStage::Done);
        done.site_type = Some(SiteType::News);
        done.priority = Some(Priority::High);
        done.links_admitted = 4;
        done.persisted = true;
        summary.record(&done);

        let mut failed = outcome(JobStage::Failed);
        failed.failed_at = Some(JobStage::Fetching);
        failed.error_kind = Some("fetch_failure");
        summary.record(&failed);
        summary.record_join(Ok(Handled::Deferred));

        assert_eq!(summary.jobs_done, 1);
        assert_eq!(summary.jobs_failed, 1);
        assert_eq!(summary.jobs_deferred, 1);
        assert_eq!(summary.jobs_finished(), 2);
        assert_eq!(summary.links_admitted, 4);
        assert_eq!(summary.pages_persisted, 1);
        assert_eq!(summary.failures_by_kind.get("fetch_failure"), Some(&1));
        assert_eq!(summary.pages_by_site_type.get(&SiteType::News), Some(&1));
    }
}
