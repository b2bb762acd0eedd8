//! Shared-deadline join over many result handles.

use std::time::{Duration, Instant};

use super::handle::ResultHandle;
use crate::request::Request;
use crate::response::Response;

/// Wait for every handle within `timeout` measured from now.
///
/// Returns one response per handle in input order. Handles still pending at
/// the deadline are degraded to timeout responses; none are cancelled.
pub fn wait_for_all(handles: &[ResultHandle], timeout: Duration) -> Vec<Response> {
    match Instant::now().checked_add(timeout) {
        Some(deadline) => wait_for_all_until(handles, deadline),
        None => handles.iter().map(ResultHandle::get).collect(),
    }
}

/// Wait for every handle within the remaining budget of `request`.
pub fn wait_for_all_within(handles: &[ResultHandle], request: &Request) -> Vec<Response> {
    wait_for_all_until(handles, request.deadline().expires_at())
}

/// Wait for every handle until the absolute `deadline`.
///
/// Each handle gets only what is left of the shared deadline, so later
/// handles get less time when earlier ones used up the budget. Once nothing
/// is left, handles are checked without blocking: those already done are
/// returned as is, the rest are degraded.
pub fn wait_for_all_until(handles: &[ResultHandle], deadline: Instant) -> Vec<Response> {
    if handles.is_empty() {
        return Vec::new();
    }

    let start = Instant::now();
    let mut timed_out = 0usize;
    let responses: Vec<Response> = handles
        .iter()
        .map(|handle| {
            let settled = if Instant::now() >= deadline {
                handle.try_get()
            } else {
                handle.wait_until(deadline)
            };
            settled.unwrap_or_else(|| {
                timed_out += 1;
                handle.timeout_response()
            })
        })
        .collect();
    tracing::debug!(
        handles = handles.len(),
        timed_out,
        waited_ms = start.elapsed().as_millis() as u64,
        "Joined result handles"
    );

    responses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::cancel::CancelFlag;
    use crate::execution::handle::Completer;
    use crate::response::{ErrorCode, Hit};
    use std::sync::Arc;
    use std::thread;

    fn pending(text: &str) -> (ResultHandle, Completer) {
        ResultHandle::pending(Request::new(text), Arc::from("test"), CancelFlag::new())
    }

    fn complete(completer: Completer, id: &str) {
        let mut response = Response::new(completer.request().clone());
        response.hits.add(Hit::new(id, 1.0));
        completer.complete(response);
    }

    fn hit_id(response: &Response) -> Option<String> {
        response.hits.iter().next().map(|h| h.id.clone())
    }

    #[test]
    fn test_empty_input_returns_immediately() {
        assert!(wait_for_all(&[], Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_preserves_input_order() {
        let (h1, c1) = pending("1");
        let (h2, c2) = pending("2");
        let (h3, c3) = pending("3");

        let worker = thread::spawn(move || {
            complete(c3, "three");
            thread::sleep(Duration::from_millis(10));
            complete(c1, "one");
            thread::sleep(Duration::from_millis(10));
            complete(c2, "two");
        });

        let responses = wait_for_all(&[h1, h2, h3], Duration::from_secs(5));
        worker.join().unwrap();

        let ids: Vec<_> = responses.iter().filter_map(hit_id).collect();
        assert_eq!(ids, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_fast_handle_survives_slow_sibling() {
        let (slow, _slow_completer) = pending("slow");
        let (fast, fast_completer) = pending("fast");
        complete(fast_completer, "fast");

        let start = Instant::now();
        let responses = wait_for_all(&[slow, fast], Duration::from_millis(50));

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(responses[0].has_error(ErrorCode::Timeout));
        assert_eq!(hit_id(&responses[1]).as_deref(), Some("fast"));
        assert!(responses[1].is_ok());
    }

    #[test]
    fn test_pending_handles_share_one_deadline() {
        let (a, _ca) = pending("a");
        let (b, _cb) = pending("b");
        let (c, _cc) = pending("c");

        let start = Instant::now();
        let responses = wait_for_all(&[a, b, c], Duration::from_millis(100));
        let elapsed = start.elapsed();

        assert_eq!(responses.len(), 3);
        assert!(responses.iter().all(|r| r.has_error(ErrorCode::Timeout)));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(250));
    }

    #[test]
    fn test_timeout_from_sub_fork_is_not_a_degraded_handle() {
        let (handle, completer) = pending("merged");
        let mut response = Response::new(completer.request().clone());
        response.add_error(crate::response::ErrorMessage::timeout("inner"));
        completer.complete(response);

        let responses = wait_for_all(std::slice::from_ref(&handle), Duration::from_secs(1));

        assert_eq!(responses[0].errors.len(), 1);
        assert_eq!(responses[0].errors[0].source.as_deref(), Some("inner"));
    }

    #[test]
    fn test_zero_budget_never_blocks() {
        let (pending_handle, _completer) = pending("p");
        let (done_handle, done_completer) = pending("d");
        complete(done_completer, "done");

        let start = Instant::now();
        let responses = wait_for_all(&[pending_handle, done_handle], Duration::ZERO);

        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(responses[0].has_error(ErrorCode::Timeout));
        assert_eq!(hit_id(&responses[1]).as_deref(), Some("done"));
    }

    #[test]
    fn test_expired_request_degrades_pending_handles() {
        let request = Request::with_timeout("q", Duration::ZERO);
        let (a, _ca) = pending("a");
        let (b, _cb) = pending("b");

        let responses = wait_for_all_within(&[a, b], &request);

        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r.has_error(ErrorCode::Timeout)));
    }

    #[test]
    fn test_does_not_cancel_timed_out_handles() {
        let (slow, _completer) = pending("slow");
        let handles = [slow];

        let _ = wait_for_all(&handles, Duration::from_millis(5));

        assert!(!handles[0].is_cancelled());
        assert!(!handles[0].is_done());
    }
}
