//! Chain execution: synchronous traversal, asynchronous forks and joins.
//!
//! ## Architecture
//!
//! ```text
//! Execution          drives one request through a chain, one stage at a time
//!   └─ nested        end of an inner chain continues into the outer execution
//! AsyncExecution     runs an Execution as one job on a caller-supplied pool
//!   └─ ResultHandle  pending → done | cancelled, timeout-bounded retrieval
//! wait_for_all       joins many handles against one shared deadline
//! ```
//!
//! Timeouts, cancellation and pool rejection never surface as `Err`: they
//! become a `Response` carrying an `ErrorMessage`, so partial results can
//! still be merged by the stage that forked the work.

mod async_execution;
mod barrier;
mod cancel;
#[allow(clippy::module_inception)]
mod execution;
mod handle;

pub use async_execution::AsyncExecution;
pub use barrier::{wait_for_all, wait_for_all_until, wait_for_all_within};
pub use cancel::CancelFlag;
pub use execution::Execution;
pub use handle::ResultHandle;
