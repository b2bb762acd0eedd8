//! Immutable chains of search stages.
//!
//! ## Architecture
//!
//! ```text
//! Chain → Stages
//!
//! - Chain: Named, ordered, immutable sequence of stages (sub-ranges share storage)
//! - Stage: One unit of processing; decides whether and how often to continue
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use searchchain::{Chain, Execution, Request};
//! use std::sync::Arc;
//!
//! let chain = Chain::new("default", vec![Arc::new(Rewrite), Arc::new(Backend)]);
//! let response = Execution::new(chain).search(Request::new("rust"))?;
//! ```

#[allow(clippy::module_inception)]
mod chain;
mod stage;

pub use chain::Chain;
pub use stage::{SharedStage, Stage};
