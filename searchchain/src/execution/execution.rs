//! Synchronous chain traversal.

use std::fmt;

use searchchain_shared::ChainResult;

use super::cancel::CancelFlag;
use crate::chain::Chain;
use crate::request::Request;
use crate::response::{ErrorMessage, Hit, Response};

/// Cursor driving one request through a chain.
///
/// The cursor points at the next stage to invoke. While a stage runs the
/// cursor is already advanced past it, so `execution.search(..)` inside the
/// stage continues to the following stage; the cursor is restored when the
/// call returns, which lets a stage continue any number of times.
///
/// An execution serves exactly one request and is not shared between
/// threads. Work that needs parallelism goes through
/// [`AsyncExecution`](super::AsyncExecution).
#[derive(Clone)]
pub struct Execution {
    chain: Chain,
    index: usize,
    /// Continuation taken when the end of `chain` is reached.
    outer: Option<Box<Execution>>,
    cancel: CancelFlag,
}

impl Execution {
    /// Execution positioned at the first stage of `chain`.
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            index: 0,
            outer: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Execution over `chain` that continues into `outer` at its current
    /// position once `chain` is exhausted.
    ///
    /// To the stages involved this is indistinguishable from one flat chain.
    pub fn nested(chain: Chain, outer: &Execution) -> Self {
        Self {
            chain,
            index: 0,
            outer: Some(Box::new(outer.clone())),
            cancel: outer.cancel.clone(),
        }
    }

    /// Independent copy of `execution`, positioned where it currently is.
    pub fn resume(execution: &Execution) -> Self {
        execution.clone()
    }

    /// Replace the cancellation flag of this execution and every execution
    /// it continues into.
    pub(crate) fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.set_cancel(cancel);
        self
    }

    fn set_cancel(&mut self, cancel: CancelFlag) {
        if let Some(outer) = self.outer.as_deref_mut() {
            outer.set_cancel(cancel.clone());
        }
        self.cancel = cancel;
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Index of the next stage to invoke within [`Execution::chain`].
    pub fn position(&self) -> usize {
        self.index
    }

    /// Number of outer executions this one continues into.
    pub fn depth(&self) -> usize {
        self.outer.as_ref().map_or(0, |outer| outer.depth() + 1)
    }

    /// Whether the work this execution belongs to has been cancelled.
    ///
    /// Long-running stages may poll this to stop early.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Continue `request` into the next stage.
    ///
    /// At the end of the chain this continues into the outer execution if
    /// there is one, and otherwise returns an empty response. Errors returned
    /// by a stage propagate unchanged.
    pub fn search(&mut self, request: Request) -> ChainResult<Response> {
        if self.cancel.is_cancelled() {
            tracing::debug!(
                chain = %self.chain.id(),
                position = self.index,
                request_id = %request.id().short(),
                "Execution cancelled, not continuing"
            );
            return Ok(Response::with_error(
                request,
                ErrorMessage::cancelled(self.chain.id()),
            ));
        }

        let Some(stage) = self.chain.stage(self.index).cloned() else {
            return match self.outer.as_deref_mut() {
                Some(outer) => outer.search(request),
                None => Ok(Response::new(request)),
            };
        };

        tracing::trace!(
            chain = %self.chain.id(),
            stage = stage.id(),
            position = self.index,
            request_id = %request.id().short(),
            "Invoking stage"
        );

        self.index += 1;
        let result = stage.search(request, self);
        self.index -= 1;

        if let Err(ref e) = result {
            tracing::debug!(
                chain = %self.chain.id(),
                stage = stage.id(),
                error = %e,
                "Stage returned error"
            );
        }

        result
    }

    /// Continue the fill phase for `summary_class` into the next stage.
    ///
    /// At the end of the outermost chain every hit is marked as filled.
    pub fn fill(&mut self, response: &mut Response, summary_class: &str) -> ChainResult<()> {
        if self.cancel.is_cancelled() {
            response.add_error(ErrorMessage::cancelled(self.chain.id()));
            return Ok(());
        }

        let Some(stage) = self.chain.stage(self.index).cloned() else {
            return match self.outer.as_deref_mut() {
                Some(outer) => outer.fill(response, summary_class),
                None => {
                    response.hits.for_each_mut(&mut |hit: &mut Hit| {
                        hit.filled.insert(summary_class.to_string());
                    });
                    Ok(())
                }
            };
        };

        tracing::trace!(
            chain = %self.chain.id(),
            stage = stage.id(),
            position = self.index,
            summary_class,
            "Filling through stage"
        );

        self.index += 1;
        let result = stage.fill(response, summary_class, self);
        self.index -= 1;
        result
    }
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("chain", &self.chain.id())
            .field("position", &self.index)
            .field("depth", &self.depth())
            .finish()
    }
}
