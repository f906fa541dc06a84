//! Error types for tree construction and queries.

use thiserror::Error;

/// Errors surfaced by [`SsTree`](crate::SsTree) construction and queries.
///
/// A failing call never touches tree state, so the tree remains usable
/// after any error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A caller-supplied parameter was outside the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
