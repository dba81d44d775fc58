//! Bot error type.

use guard_adapters::AdapterError;
use guard_config::ConfigError;
use guard_policy::GuardError;
use thiserror::Error;

/// Result alias for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors surfaced to bot callers.
#[derive(Debug, Error)]
pub enum BotError {
    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] AdapterError),

    /// The guarded turn could not reach a decision.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Configuration could not be applied.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tool list is invalid.
    #[error(transparent)]
    ToolSpec(#[from] guard_primitives::Error),

    /// No provider is registered under the requested name.
    #[error("provider `{name}` is not available")]
    UnknownProvider {
        /// The requested name.
        name: String,
    },
}
