//! Tokio runtime as a worker pool.

use super::{Job, Rejected, WorkerPool};

/// Jobs run on the runtime's blocking thread pool, since stages block.
///
/// If the runtime is shut down the job is dropped unrun, which resolves its
/// handle with an `Unavailable` error.
impl WorkerPool for tokio::runtime::Handle {
    fn submit(&self, job: Job) -> Result<(), Rejected> {
        drop(self.spawn_blocking(job));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_runs_job_on_blocking_pool() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();

        rt.handle()
            .submit(Box::new(move || {
                tx.send(std::thread::current().id()).unwrap();
            }))
            .unwrap();

        let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, std::thread::current().id());
    }
}
