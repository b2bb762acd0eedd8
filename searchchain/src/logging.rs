//! Tracing subscriber setup.
//!
//! The engine only emits `tracing` events. Embedders that do not install
//! their own subscriber can use one of these.

use std::path::Path;

use searchchain_shared::{ChainError, ChainResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "searchchain.log";

/// `RUST_LOG` wins over `default_filter` when set.
fn env_filter(default_filter: &str) -> ChainResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| ChainError::Config(format!("invalid log filter '{}': {}", default_filter, e)))
}

/// Log to stderr.
pub fn init_logging(default_filter: &str) -> ChainResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ChainError::InvalidState(format!("logging already initialized: {}", e)))
}

/// Log to a daily rolling file in `dir`.
///
/// Keep the returned guard alive; buffered events are flushed when it drops.
pub fn init_logging_to(dir: &Path, default_filter: &str) -> ChainResult<WorkerGuard> {
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter)?)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| ChainError::InvalidState(format!("logging already initialized: {}", e)))?;

    Ok(guard)
}
