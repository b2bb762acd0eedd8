use super::{Job, Rejected, WorkerPool};

/// Runs every job immediately on the submitting thread.
///
/// Handles returned through this pool are already done when `submit`
/// returns, which makes traversals deterministic in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn submit(&self, job: Job) -> Result<(), Rejected> {
        job();
        Ok(())
    }
}
