//! Multi-source configuration loading.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use guard_adapters::AdapterError;
use thiserror::Error;
use tracing::debug;

use crate::schema::GuardConfig;

/// Project-level configuration file picked up from the working directory.
pub const PROJECT_CONFIG_FILE: &str = "llm-guard.toml";

/// Prefix of environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "LLM_GUARD_";

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the schema.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// An explicitly requested file does not exist.
    #[error("configuration file `{}` not found", .path.display())]
    MissingFile {
        /// The requested path.
        path: PathBuf,
    },

    /// The default provider names no known backend.
    #[error("unknown provider `{name}`")]
    UnknownProvider {
        /// The configured name.
        name: String,
    },

    /// A provider override was rejected.
    #[error("invalid provider settings: {0}")]
    Provider(#[from] AdapterError),
}

impl GuardConfig {
    /// Loads configuration from every source.
    ///
    /// Priority (highest to lowest):
    /// 1. `LLM_GUARD_*` environment variables
    /// 2. Explicit config path (if provided)
    /// 3. `./llm-guard.toml`
    /// 4. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed, the explicit file is
    /// missing, or the result fails validation.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(PROJECT_CONFIG_FILE));

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            debug!(path = %path.display(), "loading explicit configuration file");
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }
}
