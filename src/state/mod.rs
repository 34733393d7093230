//! State module for tracking crawl progress
//!
//! This module provides the in-memory state a worker keeps while crawling.
//!
//! # Components
//!
//! - `JobStage`: Tracks the stage of an individual job (fetching, validating, ..., done, failed)
//! - `PolitenessBuffer`: Tracks per-domain in-flight jobs, the jobs deferred behind them
//!   and the links discovered meanwhile

mod domain_state;
mod job_stage;

// Re-export main types
pub use domain_state::{DomainRelease, PolitenessBuffer};
pub use job_stage::JobStage;
