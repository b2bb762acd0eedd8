//! Single-result asynchronous handle.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::cancel::CancelFlag;
use crate::request::Request;
use crate::response::{ErrorMessage, Response};

enum Slot {
    Pending,
    Done(Response),
    Cancelled,
}

struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
    cancel: CancelFlag,
}

impl Shared {
    /// Store `response` if still pending. First resolution wins.
    fn resolve(&self, response: Response) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Done(response);
        self.ready.notify_all();
        true
    }
}

/// Handle to the response of a forked traversal.
///
/// States: `pending → done` exactly once, or `pending → cancelled`.
/// Retrieval never fails: a handle that is still pending when a timed wait
/// elapses yields a response carrying a timeout error, and a cancelled handle
/// yields a response carrying a cancellation error.
pub struct ResultHandle {
    shared: Arc<Shared>,
    request: Request,
    chain_id: Arc<str>,
}

impl ResultHandle {
    /// Pending handle plus the completer the background job resolves it with.
    pub(crate) fn pending(
        request: Request,
        chain_id: Arc<str>,
        cancel: CancelFlag,
    ) -> (Self, Completer) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending),
            ready: Condvar::new(),
            cancel,
        });
        let completer = Completer {
            shared: Arc::clone(&shared),
            request: request.clone(),
            chain_id: Arc::clone(&chain_id),
            armed: true,
        };
        (
            Self {
                shared,
                request,
                chain_id,
            },
            completer,
        )
    }

    pub(crate) fn resolve(&self, response: Response) -> bool {
        self.shared.resolve(response)
    }

    /// Request the handle was created for.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Chain whose traversal this handle tracks.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn is_done(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Done(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Cancelled)
    }

    /// Cancel a pending handle.
    ///
    /// Signals the traversal to stop at its next checkpoint; a stage already
    /// running is not interrupted. Returns `false` if the handle had already
    /// completed or been cancelled.
    pub fn cancel(&self) -> bool {
        let mut slot = self.shared.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Cancelled;
        self.shared.cancel.cancel();
        self.shared.ready.notify_all();

        tracing::debug!(
            chain = %self.chain_id,
            request_id = %self.request.id().short(),
            "Result handle cancelled"
        );
        true
    }

    /// Block until the traversal completes.
    pub fn get(&self) -> Response {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            self.shared.ready.wait(&mut slot);
        }
        self.settled(&slot)
    }

    /// Block for at most `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Response {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.get_until(deadline),
            None => self.get(),
        }
    }

    /// Block until `deadline` at the latest.
    ///
    /// The slot is re-examined under the lock after the wait elapses, so a
    /// completion racing with the deadline is always observed.
    pub fn get_until(&self, deadline: Instant) -> Response {
        self.wait_until(deadline).unwrap_or_else(|| {
            tracing::debug!(
                chain = %self.chain_id,
                request_id = %self.request.id().short(),
                "Result handle timed out"
            );
            self.timeout_response()
        })
    }

    /// Bounded wait; `None` if still pending at `deadline`.
    pub(crate) fn wait_until(&self, deadline: Instant) -> Option<Response> {
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Pending) {
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }

        match *slot {
            Slot::Pending => None,
            _ => Some(self.settled(&slot)),
        }
    }

    /// Non-blocking retrieval; `None` while pending.
    pub fn try_get(&self) -> Option<Response> {
        let slot = self.shared.slot.lock();
        match *slot {
            Slot::Pending => None,
            _ => Some(self.settled(&slot)),
        }
    }

    /// Degraded response used when this handle misses its deadline.
    pub fn timeout_response(&self) -> Response {
        Response::with_error(self.request.clone(), ErrorMessage::timeout(&self.chain_id))
    }

    fn settled(&self, slot: &Slot) -> Response {
        match slot {
            Slot::Done(response) => response.clone(),
            Slot::Cancelled => Response::with_error(
                self.request.clone(),
                ErrorMessage::cancelled(&self.chain_id),
            ),
            Slot::Pending => self.timeout_response(),
        }
    }
}

impl fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.shared.slot.lock() {
            Slot::Pending => "pending",
            Slot::Done(_) => "done",
            Slot::Cancelled => "cancelled",
        };
        f.debug_struct("ResultHandle")
            .field("chain", &self.chain_id)
            .field("request_id", &self.request.id())
            .field("state", &state)
            .finish()
    }
}

/// Write side of a [`ResultHandle`], owned by the background job.
///
/// If dropped without completing (the job was discarded by its pool, or
/// unwound past the completion point), the handle is resolved with an
/// `Unavailable` error so waiters are never left hanging.
pub(crate) struct Completer {
    shared: Arc<Shared>,
    request: Request,
    chain_id: Arc<str>,
    armed: bool,
}

impl Completer {
    pub(crate) fn request(&self) -> &Request {
        &self.request
    }

    pub(crate) fn complete(mut self, response: Response) {
        self.armed = false;
        if !self.shared.resolve(response) {
            tracing::trace!(
                chain = %self.chain_id,
                request_id = %self.request.id().short(),
                "Discarding response for handle that is no longer pending"
            );
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let response = Response::with_error(
            self.request.clone(),
            ErrorMessage::unavailable(&self.chain_id, "job was dropped before completing"),
        );
        if self.shared.resolve(response) {
            tracing::warn!(
                chain = %self.chain_id,
                request_id = %self.request.id().short(),
                "Job dropped before completing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ErrorCode, Hit};
    use std::thread;

    fn pending() -> (ResultHandle, Completer) {
        ResultHandle::pending(Request::new("q"), Arc::from("test"), CancelFlag::new())
    }

    fn done_response(handle: &ResultHandle, id: &str) -> Response {
        let mut response = Response::new(handle.request().clone());
        response.hits.add(Hit::new(id, 1.0));
        response
    }

    #[test]
    fn test_get_returns_completed_response() {
        let (handle, completer) = pending();
        let response = done_response(&handle, "x");

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete(response);
        });

        let response = handle.get();
        worker.join().unwrap();

        assert!(handle.is_done());
        assert_eq!(response.hits.hit_count(), 1);
    }

    #[test]
    fn test_get_timeout_degrades_instead_of_blocking() {
        let (handle, _completer) = pending();

        let start = Instant::now();
        let response = handle.get_timeout(Duration::from_millis(50));

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(response.has_error(ErrorCode::Timeout));
        assert!(!handle.is_done());
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_first_resolution_wins() {
        let (handle, completer) = pending();
        assert!(handle.resolve(done_response(&handle, "first")));
        completer.complete(done_response(&handle, "second"));

        let response = handle.try_get().unwrap();
        assert_eq!(response.hits.iter().next().unwrap().id, "first");
    }

    #[test]
    fn test_cancel_is_terminal() {
        let (handle, completer) = pending();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.shared.cancel.is_cancelled());

        completer.complete(done_response(&handle, "late"));

        assert!(handle.is_cancelled());
        assert!(!handle.is_done());
        assert!(handle.get().has_error(ErrorCode::Cancelled));
    }

    #[test]
    fn test_cancel_after_done_is_rejected() {
        let (handle, completer) = pending();
        completer.complete(done_response(&handle, "x"));

        assert!(!handle.cancel());
        assert!(handle.is_done());
    }

    #[test]
    fn test_dropped_completer_resolves_unavailable() {
        let (handle, completer) = pending();
        drop(completer);

        let response = handle.get_timeout(Duration::from_secs(5));
        assert!(response.has_error(ErrorCode::Unavailable));
        assert!(handle.is_done());
    }

    #[test]
    fn test_try_get_pending_is_none() {
        let (handle, _completer) = pending();
        assert!(handle.try_get().is_none());
    }
}
