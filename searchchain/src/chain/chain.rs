//! Chain definition.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use searchchain_shared::{ChainError, ChainResult};

use super::stage::SharedStage;

/// Named, ordered, immutable sequence of stages.
///
/// Cloning is cheap: clones and sub-ranges share the same stage storage.
/// Two chains with different ids are distinct even if they share stages.
#[derive(Clone)]
pub struct Chain {
    id: Arc<str>,
    stages: Arc<[SharedStage]>,
    range: Range<usize>,
}

impl Chain {
    pub fn new(id: impl Into<String>, stages: Vec<SharedStage>) -> Self {
        let id: String = id.into();
        let len = stages.len();
        Self {
            id: Arc::from(id),
            stages: Arc::from(stages),
            range: 0..len,
        }
    }

    /// Like [`Chain::new`], but rejects an empty stage list.
    pub fn non_empty(id: impl Into<String>, stages: Vec<SharedStage>) -> ChainResult<Self> {
        let id = id.into();
        if stages.is_empty() {
            return Err(ChainError::Config(format!(
                "chain '{}' must contain at least one stage",
                id
            )));
        }
        Ok(Self::new(id, stages))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stages visible through this chain, in order.
    pub fn stages(&self) -> &[SharedStage] {
        &self.stages[self.range.clone()]
    }

    pub fn stage(&self, index: usize) -> Option<&SharedStage> {
        self.stages().get(index)
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// View over stages `from..to` of this chain. Bounds are clamped.
    pub fn sub_range(&self, from: usize, to: usize) -> Self {
        let to = to.min(self.len());
        let from = from.min(to);
        Self {
            id: Arc::clone(&self.id),
            stages: Arc::clone(&self.stages),
            range: self.range.start + from..self.range.start + to,
        }
    }

    /// The first `n` stages.
    pub fn head(&self, n: usize) -> Self {
        self.sub_range(0, n)
    }

    /// Stages from `from` to the end.
    pub fn tail(&self, from: usize) -> Self {
        self.sub_range(from, self.len())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field(
                "stages",
                &self.stages().iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
