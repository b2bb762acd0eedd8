//! Types shared between the searchchain engine and its collaborators.

pub mod constants;
pub mod errors;

pub use errors::{ChainError, ChainResult};
