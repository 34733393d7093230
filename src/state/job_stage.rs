/// Pipeline stage definitions for tracking a crawl job
///
/// Every job walks the same sequence of stages; `Failed` is reachable from any
/// non-terminal stage.
use std::fmt;

/// Represents the current stage of a job in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    // ===== Active Stages =====
    /// Issuing the HTTP GET for the job's URL
    Fetching,

    /// Checking the response status and content type
    Validating,

    /// Parsing the document for links, text and media
    Extracting,

    /// Assigning the site type and recrawl priority
    Classifying,

    /// Upserting the page record into the document store
    Persisting,

    /// Admitting and scheduling the discovered links
    Reenqueuing,

    // ===== Terminal Stages =====
    /// The pipeline ran to completion
    Done,

    /// The pipeline stopped early; the job is dropped
    Failed,
}

impl JobStage {
    /// The stage every job starts in
    pub const START: JobStage = JobStage::Fetching;

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Converts the stage to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Validating => "validating",
            Self::Extracting => "extracting",
            Self::Classifying => "classifying",
            Self::Persisting => "persisting",
            Self::Reenqueuing => "reenqueuing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
