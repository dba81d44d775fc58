//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the level follows
//! [`LoggingConfig::debug`].

#![warn(missing_docs, clippy::pedantic)]

use guard_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Install {
        /// Underlying failure.
        reason: String,
    },
}

/// Builds the filter used by [`init`].
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_directive()))
}

/// Installs the global `fmt` subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Install`] if a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|err| TelemetryError::Install {
        reason: err.to_string(),
    })?;
    tracing::debug!(json = config.json, debug = config.debug, "logging initialised");
    Ok(())
}
