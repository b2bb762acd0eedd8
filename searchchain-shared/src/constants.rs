//! Engine-wide defaults.

use std::time::Duration;

/// Time budget given to a request that does not set its own timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on jobs a pool accepts before rejecting submissions.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Thread name prefix for pool workers.
pub const DEFAULT_THREAD_NAME: &str = "searchchain-worker";
