//! Execution core for chains of composable search stages.
//!
//! A [`Chain`] is an immutable sequence of [`Stage`]s. An [`Execution`]
//! drives one request through it; each stage decides whether, and how often,
//! to continue. Stages that want parallelism fork sub-traversals with
//! [`AsyncExecution`] onto a caller-supplied [`WorkerPool`], then join them
//! with [`wait_for_all`] against a shared deadline.
//!
//! ```ignore
//! use searchchain::{AsyncExecution, BoundedPool, PoolOptions, Request, wait_for_all_within};
//!
//! let pool = BoundedPool::new(PoolOptions::default())?;
//! let request = Request::new("rust");
//! let handles: Vec<_> = sources
//!     .iter()
//!     .map(|chain| AsyncExecution::new(chain.clone()).search(request.clone(), &pool))
//!     .collect();
//! let responses = wait_for_all_within(&handles, &request);
//! ```

pub mod chain;
pub mod execution;
pub mod logging;
pub mod options;
pub mod pool;
pub mod request;
pub mod response;

pub use chain::{Chain, SharedStage, Stage};
pub use execution::{
    AsyncExecution, CancelFlag, Execution, ResultHandle, wait_for_all, wait_for_all_until,
    wait_for_all_within,
};
pub use logging::{init_logging, init_logging_to};
pub use options::PoolOptions;
pub use pool::{BoundedPool, InlinePool, Job, PoolMetrics, Rejected, WorkerPool};
pub use request::{Deadline, Request, RequestId};
pub use response::{ErrorCode, ErrorMessage, Hit, HitGroup, Node, Response};
pub use searchchain_shared::{ChainError, ChainResult};
