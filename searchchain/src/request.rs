//! Request model: identity, query payload and an absolute deadline.
//!
//! The deadline is a plain value copied on clone, so every clone of a request
//! shares the exact expiry instant of the original. Nothing in the engine
//! extends a deadline once it exists; [`Request::restrict_timeout`] can only
//! bring it closer.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use searchchain_shared::constants::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Unique request identifier (ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Last 8 characters, enough to tell requests apart in logs.
    pub fn short(&self) -> String {
        let s = self.0.to_string();
        s[s.len() - 8..].to_string()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute time budget of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: Instant,
    expires_at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now. Budgets past what `Instant` can
    /// represent saturate to the latest representable instant.
    pub fn after(timeout: Duration) -> Self {
        let start = Instant::now();
        Self {
            start,
            expires_at: saturating_add(start, timeout),
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Full budget this deadline was created with.
    pub fn timeout(&self) -> Duration {
        self.expires_at.duration_since(self.start)
    }

    /// Remaining budget, zero once expired.
    pub fn time_left(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// The earlier of this deadline and `now + timeout`.
    pub fn restrict(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(candidate) => Self {
                start: self.start,
                expires_at: self.expires_at.min(candidate),
            },
            None => self,
        }
    }
}

/// `start + timeout`, halving the overshoot until it fits.
fn saturating_add(start: Instant, timeout: Duration) -> Instant {
    let mut step = timeout;
    loop {
        if let Some(instant) = start.checked_add(step) {
            return instant;
        }
        step /= 2;
    }
}

/// A single request travelling through a chain.
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    text: String,
    properties: BTreeMap<String, Value>,
    deadline: Deadline,
}

impl Request {
    /// New request with [`DEFAULT_TIMEOUT`].
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_timeout(text, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            id: RequestId::new(),
            text: text.into(),
            properties: BTreeMap::new(),
            deadline: Deadline::after(timeout),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn time_left(&self) -> Duration {
        self.deadline.time_left()
    }

    pub fn is_timed_out(&self) -> bool {
        self.deadline.is_expired()
    }

    /// Shorten the remaining budget to at most `timeout`. Never extends it.
    pub fn restrict_timeout(&mut self, timeout: Duration) {
        self.deadline = self.deadline.restrict(timeout);
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_deadline() {
        let request = Request::with_timeout("q", Duration::from_millis(500));
        std::thread::sleep(Duration::from_millis(20));
        let clone = request.clone();

        assert_eq!(clone.deadline(), request.deadline());
        assert_eq!(clone.id(), request.id());
        assert!(clone.time_left() <= Duration::from_millis(480));
    }

    #[test]
    fn test_restrict_never_extends() {
        let mut request = Request::with_timeout("q", Duration::from_millis(100));
        let before = request.deadline().expires_at();

        request.restrict_timeout(Duration::from_secs(60));
        assert_eq!(request.deadline().expires_at(), before);

        request.restrict_timeout(Duration::from_millis(10));
        assert!(request.deadline().expires_at() < before);
    }

    #[test]
    fn test_unbounded_timeout_saturates() {
        let mut request = Request::with_timeout("q", Duration::MAX);
        assert!(!request.is_timed_out());
        assert!(request.time_left() > Duration::from_secs(365 * 24 * 3600));

        let before = request.deadline();
        request.restrict_timeout(Duration::MAX);
        assert_eq!(request.deadline(), before);

        let mut bounded = Request::new("q");
        let before = bounded.deadline();
        bounded.restrict_timeout(Duration::MAX);
        assert_eq!(bounded.deadline(), before);
    }

    #[test]
    fn test_zero_timeout_is_expired() {
        let request = Request::with_timeout("q", Duration::ZERO);
        assert!(request.is_timed_out());
        assert_eq!(request.time_left(), Duration::ZERO);
    }

    #[test]
    fn test_properties() {
        let mut request = Request::new("q");
        request.set_property("hits", 10);
        assert_eq!(request.property("hits"), Some(&Value::from(10)));
        assert!(request.property("offset").is_none());
    }

    #[test]
    fn test_short_id() {
        let id = RequestId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().ends_with(&id.short()));
    }
}
