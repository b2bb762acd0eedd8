//! Pool counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by a pool.
#[derive(Debug, Default)]
pub struct PoolMetricsStorage {
    pub(crate) submitted: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) rejected: AtomicU64,
    pub(crate) outstanding: AtomicU64,
}

impl PoolMetricsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            outstanding: self.outstanding.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time view of [`PoolMetricsStorage`].
///
/// Counters are monotonic except `outstanding`, which is the number of
/// accepted jobs that have not finished yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    pub submitted: u64,
    pub completed: u64,
    pub rejected: u64,
    pub outstanding: u64,
}
