//! Stage trait.

use std::sync::Arc;

use searchchain_shared::ChainResult;

use crate::execution::Execution;
use crate::request::Request;
use crate::response::Response;

/// One unit of a chain.
///
/// A stage receives the request and the execution positioned at the next
/// stage. It may pass through (`execution.search(request)`), rewrite the
/// request first, continue several times with clones, never continue at all,
/// or fork asynchronous sub-traversals and merge them before returning.
pub trait Stage: Send + Sync {
    /// Identifier used in logs and error sources.
    fn id(&self) -> &str;

    /// Produce a response for `request`.
    fn search(&self, request: Request, execution: &mut Execution) -> ChainResult<Response>;

    /// Second phase: fill deferred content of `response` for `summary_class`.
    ///
    /// The default passes the fill on to the next stage.
    fn fill(
        &self,
        response: &mut Response,
        summary_class: &str,
        execution: &mut Execution,
    ) -> ChainResult<()> {
        execution.fill(response, summary_class)
    }
}

pub type SharedStage = Arc<dyn Stage>;
