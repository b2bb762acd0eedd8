//! Configuration options.

use searchchain_shared::constants::{DEFAULT_MAX_PENDING, DEFAULT_THREAD_NAME};
use searchchain_shared::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};

/// Options for building a [`BoundedPool`](crate::pool::BoundedPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Worker threads. Defaults to available parallelism.
    pub threads: usize,
    /// Jobs accepted but not yet finished before submissions are rejected.
    pub max_pending: usize,
    /// Worker thread name prefix.
    pub thread_name: String,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_pending: DEFAULT_MAX_PENDING,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl PoolOptions {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ChainResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.sanitize()?;
        Ok(options)
    }

    pub fn sanitize(&self) -> ChainResult<()> {
        if self.threads == 0 {
            return Err(ChainError::Config("threads must be at least 1".into()));
        }
        if self.max_pending == 0 {
            return Err(ChainError::Config("max_pending must be at least 1".into()));
        }
        if self.thread_name.is_empty() {
            return Err(ChainError::Config("thread_name must not be empty".into()));
        }
        Ok(())
    }
}
