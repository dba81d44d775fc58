//! Configuration for guarded LLM bots.
//!
//! Values are layered from built-in defaults, `./llm-guard.toml`, an optional
//! explicit file, and `LLM_GUARD_`-prefixed environment variables (nested
//! keys separated by `__`). Secrets are never read from configuration.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigResult, ENV_PREFIX, PROJECT_CONFIG_FILE};
pub use schema::{BackendSettings, GuardConfig, LoggingConfig, ProvidersConfig};
