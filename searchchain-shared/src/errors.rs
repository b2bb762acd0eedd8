//! Error taxonomy for chain execution.
//!
//! Only genuine faults are represented here. Timeouts, cancellation and pool
//! rejection observed through a result handle are carried as data on the
//! response instead.

use thiserror::Error;

pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Debug, Error)]
pub enum ChainError {
    /// A stage failed in its own logic.
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// A worker pool refused a job.
    #[error("pool rejected job: {0}")]
    PoolRejected(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ChainError {
    /// Shorthand for a stage fault.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display() {
        let err = ChainError::stage("rank", "model missing");
        assert_eq!(err.to_string(), "stage 'rank' failed: model missing");
    }

    #[test]
    fn test_io_error_converts() {
        fn open() -> ChainResult<()> {
            Err(std::io::Error::other("disk gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(ChainError::Io(_))));
    }
}
