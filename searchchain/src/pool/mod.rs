//! Worker pool abstraction.
//!
//! The engine never creates, sizes or shuts down a pool. Every asynchronous
//! call site receives one from its caller as `&dyn WorkerPool`. Provided
//! implementations:
//!
//! - [`BoundedPool`]: rayon thread pool with a cap on outstanding jobs
//! - [`InlinePool`]: runs jobs on the submitting thread
//! - `tokio::runtime::Handle`: jobs go to the blocking thread pool

mod bounded;
mod inline;
mod metrics;
mod runtime;

use std::fmt;

use searchchain_shared::ChainError;

pub use bounded::BoundedPool;
pub use inline::InlinePool;
pub use metrics::{PoolMetrics, PoolMetricsStorage};

/// Unit of work submitted to a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Substrate that runs jobs in the background.
pub trait WorkerPool: Send + Sync {
    /// Schedule `job`. On refusal the job is handed back unrun.
    fn submit(&self, job: Job) -> Result<(), Rejected>;
}

/// A job the pool refused to schedule.
pub struct Rejected {
    job: Job,
    reason: String,
}

impl Rejected {
    pub fn new(job: Job, reason: impl Into<String>) -> Self {
        Self {
            job,
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Take the refused job back.
    pub fn into_job(self) -> Job {
        self.job
    }
}

impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool rejected job: {}", self.reason)
    }
}

impl From<Rejected> for ChainError {
    fn from(rejected: Rejected) -> Self {
        ChainError::PoolRejected(rejected.reason)
    }
}
