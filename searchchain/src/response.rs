//! Response model: a tree of hits plus a flat list of structured errors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::Request;

/// Classification of recoverable errors carried on a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Timeout,
    Cancelled,
    /// Work could not be scheduled or was dropped before it ran.
    Unavailable,
    /// A background traversal failed.
    StageFailure,
    Other,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::Cancelled => write!(f, "cancelled"),
            ErrorCode::Unavailable => write!(f, "unavailable"),
            ErrorCode::StageFailure => write!(f, "stage failure"),
            ErrorCode::Other => write!(f, "other"),
        }
    }
}

/// Structured error value attached to a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub message: String,
    /// Chain or stage that produced the error.
    pub source: Option<String>,
}

impl ErrorMessage {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn timeout(chain: &str) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Error executing '{}': chain timed out", chain),
        )
        .with_source(chain)
    }

    pub fn cancelled(chain: &str) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            format!("Error executing '{}': execution was cancelled", chain),
        )
        .with_source(chain)
    }

    pub fn unavailable(chain: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Unavailable,
            format!("Error executing '{}': {}", chain, reason),
        )
        .with_source(chain)
    }

    pub fn stage_failure(chain: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::StageFailure,
            format!("Error executing '{}': {}", chain, reason),
        )
        .with_source(chain)
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// A single result node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    pub relevance: f64,
    /// Stage or chain that produced the hit.
    pub source: Option<String>,
    pub fields: BTreeMap<String, Value>,
    /// Summary classes already filled into `fields`.
    pub filled: BTreeSet<String>,
}

impl Hit {
    pub fn new(id: impl Into<String>, relevance: f64) -> Self {
        Self {
            id: id.into(),
            relevance,
            source: None,
            fields: BTreeMap::new(),
            filled: BTreeSet::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_filled(&self, summary_class: &str) -> bool {
        self.filled.contains(summary_class)
    }
}

/// Child of a [`HitGroup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Hit(Hit),
    Group(HitGroup),
}

impl Node {
    fn relevance(&self) -> f64 {
        match self {
            Node::Hit(hit) => hit.relevance,
            Node::Group(group) => group.max_relevance().unwrap_or(f64::NEG_INFINITY),
        }
    }
}

/// Ordered group of hits and nested groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitGroup {
    pub id: String,
    pub children: Vec<Node>,
}

impl HitGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    pub fn add(&mut self, hit: Hit) {
        self.children.push(Node::Hit(hit));
    }

    pub fn add_group(&mut self, group: HitGroup) {
        self.children.push(Node::Group(group));
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Walks every hit in the tree, depth first.
    pub fn iter(&self) -> impl Iterator<Item = &Hit> + '_ {
        let mut stack: Vec<std::slice::Iter<'_, Node>> = vec![self.children.iter()];
        std::iter::from_fn(move || {
            while let Some(top) = stack.last_mut() {
                match top.next() {
                    Some(Node::Hit(hit)) => return Some(hit),
                    Some(Node::Group(group)) => stack.push(group.children.iter()),
                    None => {
                        stack.pop();
                    }
                }
            }
            None
        })
    }

    /// Mutable depth-first visit of every hit.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Hit)) {
        for child in &mut self.children {
            match child {
                Node::Hit(hit) => f(hit),
                Node::Group(group) => group.for_each_mut(f),
            }
        }
    }

    /// Total hits in the tree.
    pub fn hit_count(&self) -> usize {
        self.iter().count()
    }

    pub fn max_relevance(&self) -> Option<f64> {
        self.iter().map(|hit| hit.relevance).reduce(f64::max)
    }

    /// Sort children by descending relevance. Stable: equal relevance keeps
    /// insertion order.
    pub fn sort_by_relevance(&mut self) {
        for child in &mut self.children {
            if let Node::Group(group) = child {
                group.sort_by_relevance();
            }
        }
        self.children
            .sort_by(|a, b| b.relevance().total_cmp(&a.relevance()));
    }

    pub fn truncate(&mut self, len: usize) {
        self.children.truncate(len);
    }
}

/// Result of running a request through a chain.
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    pub hits: HitGroup,
    pub errors: Vec<ErrorMessage>,
    pub total_hit_count: u64,
}

impl Response {
    /// Empty response for `request`.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            hits: HitGroup::new("toplevel"),
            errors: Vec::new(),
            total_hit_count: 0,
        }
    }

    pub fn with_error(request: Request, error: ErrorMessage) -> Self {
        let mut response = Self::new(request);
        response.add_error(error);
        response
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Add an error unless an identical one is already present.
    pub fn add_error(&mut self, error: ErrorMessage) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Union of error lists, keeping order of first occurrence.
    pub fn merge_errors(&mut self, other: &Response) {
        for error in &other.errors {
            self.add_error(error.clone());
        }
    }

    /// Merge error and counting state, leaving the hit tree alone.
    pub fn merge_with(&mut self, other: &Response) {
        self.merge_errors(other);
        self.total_hit_count += other.total_hit_count;
    }

    /// Splice `other`'s hits flat into this response's top-level group.
    pub fn append_hits(&mut self, other: Response) {
        self.merge_with(&other);
        self.hits.children.extend(other.hits.children);
    }

    /// Splice `other`'s hits in as a single subtree named `group_id`.
    pub fn nest_hits(&mut self, other: Response, group_id: impl Into<String>) {
        self.merge_with(&other);
        let mut group = other.hits;
        group.id = group_id.into();
        self.hits.add_group(group);
    }

    /// Whether every hit has been filled with `summary_class`.
    pub fn is_filled(&self, summary_class: &str) -> bool {
        self.hits.iter().all(|hit| hit.is_filled(summary_class))
    }
}
