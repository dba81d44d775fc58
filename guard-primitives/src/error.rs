//! Shared error definitions for primitive types.

use thiserror::Error;

/// Result alias used by primitive constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Tool specification failed validation.
    #[error("invalid tool spec `{name}`: {reason}")]
    InvalidToolSpec {
        /// Name of the offending tool (may be empty).
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Two tool specifications in the same list share a name.
    #[error("tool `{name}` is declared more than once")]
    DuplicateToolName {
        /// The repeated name.
        name: String,
    },
}
