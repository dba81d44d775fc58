//! Errors surfaced by guarded chat turns.

use guard_adapters::AdapterError;
use thiserror::Error;

/// Result alias for guardrail operations.
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that abort a guarded turn.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The guardrail could not produce a verdict. Never treated as allowed.
    #[error("guardrail inconclusive: {reason}")]
    Inconclusive {
        /// Why no verdict was reached.
        reason: String,
    },

    /// The main generation call failed after the guardrail allowed the turn.
    #[error("generation failed: {0}")]
    Generation(#[from] AdapterError),

    /// A spawned task panicked or was cancelled unexpectedly.
    #[error("guard task failed: {reason}")]
    TaskFailed {
        /// Join failure description.
        reason: String,
    },
}

impl GuardError {
    /// Convenience constructor for inconclusive verdicts.
    #[must_use]
    pub fn inconclusive(reason: impl Into<String>) -> Self {
        Self::Inconclusive {
            reason: reason.into(),
        }
    }
}
