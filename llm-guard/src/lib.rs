//! Provider-agnostic LLM invocation with unified tool calling and raced
//! guardrails.
//!
//! This facade bundles the workspace crates behind feature flags so
//! downstream users can pull in only the layers they need.

#![warn(missing_docs, clippy::pedantic)]

/// Shared primitives: tool specs, tool results, messages, token usage.
pub use guard_primitives as primitives;

/// Tool registry (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use guard_tools as tools;

/// Backend providers and tool adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use guard_adapters as adapters;

/// Guardrail racer, classifier, and canary filter (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use guard_policy as policy;

/// Layered configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use guard_config as config;

/// Logging initialisation (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use guard_telemetry as telemetry;

/// Caller-side bots and the provider catalog (enabled by `bots` feature).
#[cfg(feature = "bots")]
pub use guard_bots as bots;
