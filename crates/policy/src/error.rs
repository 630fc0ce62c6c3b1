//! Policy error types.

use thiserror::Error;

/// Policy errors.
///
/// Access denials are not errors; they are [`crate::Decision`] values. These
/// variants cover faults while building the route table at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A path pattern is malformed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A route would match some request already matched by another route.
    #[error("route {method} {pattern} conflicts with registered route {method} {existing}")]
    ConflictingRoute {
        method: crate::Method,
        pattern: String,
        existing: String,
    },

    /// An HTTP method name is not one the table understands.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
}

pub type Result<T> = std::result::Result<T, Error>;
