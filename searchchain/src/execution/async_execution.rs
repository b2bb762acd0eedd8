//! Asynchronous chain traversal on a caller-supplied pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use searchchain_shared::ChainResult;

use super::cancel::CancelFlag;
use super::execution::Execution;
use super::handle::ResultHandle;
use crate::chain::Chain;
use crate::pool::WorkerPool;
use crate::request::Request;
use crate::response::{ErrorMessage, Response};

/// Forks traversals of a chain onto a worker pool.
///
/// Holds no pool of its own: every call takes the pool to submit to. Each
/// call enqueues exactly one job and returns immediately with a
/// [`ResultHandle`]. Whatever goes wrong in the background (rejection, stage
/// fault, panic, dropped job) ends up as an error on the handle's response.
#[derive(Debug, Clone)]
pub struct AsyncExecution {
    execution: Execution,
}

impl AsyncExecution {
    /// Forks start at the first stage of `chain`.
    pub fn new(chain: Chain) -> Self {
        Self {
            execution: Execution::new(chain),
        }
    }

    /// Forks continue from the current position of `execution`, including
    /// any outer execution it continues into.
    pub fn from_execution(execution: &Execution) -> Self {
        Self {
            execution: Execution::resume(execution),
        }
    }

    /// Run a search traversal in the background.
    pub fn search(&self, request: Request, pool: &dyn WorkerPool) -> ResultHandle {
        self.submit(request, pool, |execution, request| execution.search(request))
    }

    /// Run a search traversal followed by the fill phase in the same job.
    ///
    /// The handle is only done once both phases have finished.
    pub fn search_and_fill(
        &self,
        request: Request,
        summary_class: &str,
        pool: &dyn WorkerPool,
    ) -> ResultHandle {
        let summary_class = summary_class.to_string();
        self.submit(request, pool, move |execution, request| {
            let mut response = execution.search(request)?;
            execution.fill(&mut response, &summary_class)?;
            Ok(response)
        })
    }

    /// Run only the fill phase for an existing response in the background.
    pub fn fill(
        &self,
        response: Response,
        summary_class: &str,
        pool: &dyn WorkerPool,
    ) -> ResultHandle {
        let request = response.request().clone();
        let summary_class = summary_class.to_string();
        self.submit(request, pool, move |execution, _request| {
            let mut response = response;
            execution.fill(&mut response, &summary_class)?;
            Ok(response)
        })
    }

    fn submit<F>(&self, request: Request, pool: &dyn WorkerPool, work: F) -> ResultHandle
    where
        F: FnOnce(&mut Execution, Request) -> ChainResult<Response> + Send + 'static,
    {
        let chain_id: Arc<str> = Arc::from(self.execution.chain().id());
        let cancel = CancelFlag::new();
        let (handle, completer) =
            ResultHandle::pending(request.clone(), Arc::clone(&chain_id), cancel.clone());
        let mut execution = self.execution.clone().with_cancel(cancel.clone());

        let job_chain = Arc::clone(&chain_id);
        let job = Box::new(move || {
            if cancel.is_cancelled() {
                tracing::debug!(
                    chain = %job_chain,
                    request_id = %request.id().short(),
                    "Job cancelled before start"
                );
                return;
            }

            let fallback = completer.request().clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&mut execution, request)));
            let response = match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!(chain = %job_chain, error = %e, "Background traversal failed");
                    Response::with_error(fallback, ErrorMessage::stage_failure(&job_chain, &e))
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    tracing::error!(chain = %job_chain, reason = %reason, "Background traversal panicked");
                    Response::with_error(
                        fallback,
                        ErrorMessage::stage_failure(&job_chain, format!("panicked: {}", reason)),
                    )
                }
            };
            completer.complete(response);
        });

        match pool.submit(job) {
            Ok(()) => {
                tracing::trace!(
                    chain = %chain_id,
                    request_id = %handle.request().id().short(),
                    "Submitted traversal"
                );
            }
            Err(rejected) => {
                tracing::warn!(
                    chain = %chain_id,
                    request_id = %handle.request().id().short(),
                    reason = rejected.reason(),
                    "Traversal rejected by pool"
                );
                handle.resolve(Response::with_error(
                    handle.request().clone(),
                    ErrorMessage::unavailable(&chain_id, &rejected),
                ));
                // Dropping the job after resolving keeps its completer from
                // overwriting the rejection.
                drop(rejected);
            }
        }

        handle
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
