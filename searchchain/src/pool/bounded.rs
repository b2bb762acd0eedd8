//! Thread pool with a bound on outstanding jobs.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use searchchain_shared::{ChainError, ChainResult};

use super::metrics::{PoolMetrics, PoolMetricsStorage};
use super::{Job, Rejected, WorkerPool};
use crate::options::PoolOptions;

/// Counters and idle signalling shared with running jobs.
struct PoolState {
    metrics: PoolMetricsStorage,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

/// Releases one outstanding slot when the job finishes, including on unwind.
struct OutstandingSlot(Arc<PoolState>);

impl Drop for OutstandingSlot {
    fn drop(&mut self) {
        let state = &self.0;
        state.metrics.completed.fetch_add(1, Ordering::Relaxed);
        if state.metrics.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = state.idle_lock.lock();
            state.idle.notify_all();
        }
    }
}

/// rayon-backed pool that rejects jobs beyond `max_pending` outstanding.
///
/// Cheap to clone; clones share workers and counters.
#[derive(Clone)]
pub struct BoundedPool {
    workers: Arc<rayon::ThreadPool>,
    state: Arc<PoolState>,
    max_pending: usize,
}

impl BoundedPool {
    pub fn new(options: PoolOptions) -> ChainResult<Self> {
        options.sanitize()?;

        let thread_name = options.thread_name.clone();
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(options.threads)
            .thread_name(move |i| format!("{}-{}", thread_name, i))
            .panic_handler(|_| tracing::error!("Pool job panicked"))
            .build()
            .map_err(|e| ChainError::Config(format!("Failed to build worker pool: {}", e)))?;

        tracing::debug!(
            threads = options.threads,
            max_pending = options.max_pending,
            "Worker pool started"
        );

        Ok(Self {
            workers: Arc::new(workers),
            state: Arc::new(PoolState {
                metrics: PoolMetricsStorage::new(),
                idle_lock: Mutex::new(()),
                idle: Condvar::new(),
            }),
            max_pending: options.max_pending,
        })
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.state.metrics.snapshot()
    }

    /// Jobs accepted and not yet finished.
    pub fn outstanding(&self) -> u64 {
        self.state.metrics.outstanding.load(Ordering::Acquire)
    }

    /// Block until no job is outstanding or `timeout` elapses.
    ///
    /// Returns whether the pool became idle. A timeout too large to
    /// represent waits without a deadline.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.state.idle_lock.lock();
        while self.outstanding() > 0 {
            match deadline {
                Some(deadline) => {
                    if self.state.idle.wait_until(&mut guard, deadline).timed_out() {
                        return self.outstanding() == 0;
                    }
                }
                None => self.state.idle.wait(&mut guard),
            }
        }
        true
    }

    /// Reserve an outstanding slot unless the pool is saturated.
    fn reserve(&self) -> bool {
        let max = self.max_pending as u64;
        self.state
            .metrics
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }
}

impl WorkerPool for BoundedPool {
    fn submit(&self, job: Job) -> Result<(), Rejected> {
        if !self.reserve() {
            self.state.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(max_pending = self.max_pending, "Worker pool saturated");
            return Err(Rejected::new(
                job,
                format!("{} jobs already outstanding", self.max_pending),
            ));
        }

        self.state.metrics.submitted.fetch_add(1, Ordering::Relaxed);
        let slot = OutstandingSlot(Arc::clone(&self.state));
        self.workers.spawn(move || {
            let _slot = slot;
            job();
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn pool(threads: usize, max_pending: usize) -> BoundedPool {
        BoundedPool::new(PoolOptions {
            threads,
            max_pending,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_runs_jobs_and_returns_to_idle() {
        let pool = pool(2, 16);
        let (tx, rx) = mpsc::channel();

        for i in 0..8 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(i).unwrap())).unwrap();
        }
        drop(tx);

        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());

        assert!(pool.wait_idle(Duration::from_secs(5)));
        let metrics = pool.metrics();
        assert_eq!(metrics.submitted, 8);
        assert_eq!(metrics.completed, 8);
        assert_eq!(metrics.outstanding, 0);
    }

    #[test]
    fn test_wait_idle_with_unbounded_timeout() {
        let pool = pool(1, 4);
        let (tx, rx) = mpsc::channel::<()>();
        pool.submit(Box::new(move || {
            let _ = rx.recv_timeout(Duration::from_secs(5));
        }))
        .unwrap();

        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            tx.send(()).unwrap();
        });

        assert!(pool.wait_idle(Duration::MAX));
        assert_eq!(pool.outstanding(), 0);
        releaser.join().unwrap();
    }

    #[test]
    fn test_rejects_when_saturated() {
        let pool = pool(1, 1);
        let (release_tx, release_rx) = mpsc::channel::<()>();

        pool.submit(Box::new(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        }))
        .unwrap();

        let rejected = pool.submit(Box::new(|| {})).unwrap_err();
        assert!(rejected.reason().contains("outstanding"));
        assert_eq!(pool.metrics().rejected, 1);

        release_tx.send(()).unwrap();
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert!(pool.submit(Box::new(|| {})).is_ok());
    }

    #[test]
    fn test_panicking_job_releases_slot() {
        let pool = pool(1, 4);
        pool.submit(Box::new(|| panic!("job failure"))).unwrap();

        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_rejects_invalid_options() {
        let result = BoundedPool::new(PoolOptions {
            threads: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(ChainError::Config(_))));
    }

    #[test]
    fn test_rejected_converts_to_chain_error() {
        let err: ChainError = Rejected::new(Box::new(|| {}), "full").into();
        assert!(matches!(err, ChainError::PoolRejected(ref r) if r == "full"));
    }
}
