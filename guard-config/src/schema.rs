//! Strongly typed configuration schema.

use std::time::Duration;

use guard_adapters::{InferenceParams, ProviderConfig};
use guard_policy::GuardSettings;
use serde::{Deserialize, Serialize};

use crate::loader::{ConfigError, ConfigResult};

/// Backend keys accepted by [`ProvidersConfig::default_provider`].
pub const KNOWN_BACKENDS: [&str; 4] = ["bedrock", "openai", "groq", "anthropic"];

/// Root configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Provider selection and per-backend overrides.
    pub providers: ProvidersConfig,
    /// Guardrail prompts, canary, and block messages.
    pub security: GuardSettings,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl GuardConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownProvider`] if the default provider is
    /// not a known backend.
    pub fn validate(&self) -> ConfigResult<()> {
        let default = self.providers.default_provider.as_str();
        if !KNOWN_BACKENDS.contains(&default) {
            return Err(ConfigError::UnknownProvider {
                name: default.to_owned(),
            });
        }
        Ok(())
    }
}

/// Provider selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Backend used when the caller does not pick one.
    #[serde(rename = "default")]
    pub default_provider: String,
    /// Amazon Bedrock Converse.
    pub bedrock: BackendSettings,
    /// `OpenAI` chat completions.
    pub openai: BackendSettings,
    /// Groq chat completions.
    pub groq: BackendSettings,
    /// Anthropic Messages.
    pub anthropic: BackendSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_provider: "bedrock".to_owned(),
            bedrock: BackendSettings::default(),
            openai: BackendSettings::default(),
            groq: BackendSettings::default(),
            anthropic: BackendSettings::default(),
        }
    }
}

impl ProvidersConfig {
    /// Looks up the settings for a backend key.
    #[must_use]
    pub fn backend(&self, name: &str) -> Option<&BackendSettings> {
        match name {
            "bedrock" => Some(&self.bedrock),
            "openai" => Some(&self.openai),
            "groq" => Some(&self.groq),
            "anthropic" => Some(&self.anthropic),
            _ => None,
        }
    }
}

/// Overrides for one backend. Unset fields keep the backend defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Whether the backend is built at all.
    pub enabled: bool,
    /// Display name used to tag token usage.
    pub name: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
    /// API root override.
    pub base_url: Option<String>,
    /// Region (Bedrock only).
    pub region: Option<String>,
    /// Per-attempt request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts for connect and timeout failures.
    pub max_attempts: u32,
    /// Fixed inference parameters.
    pub params: Option<InferenceParams>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
            model: None,
            base_url: None,
            region: None,
            timeout_secs: 60,
            max_attempts: 2,
            params: None,
        }
    }
}

impl BackendSettings {
    /// Layers these overrides on top of a backend's default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Provider`] if the base URL override is invalid.
    pub fn apply(&self, base: ProviderConfig) -> ConfigResult<ProviderConfig> {
        let mut config = base
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_attempts(self.max_attempts);
        if let Some(name) = &self.name {
            config = config.with_name(name);
        }
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url)?;
        }
        if let Some(region) = &self.region {
            config = config.with_region(region);
        }
        if let Some(params) = &self.params {
            config = config.with_params(params.clone());
        }
        Ok(config)
    }
}

/// Log output settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log at `debug` instead of `info` when `RUST_LOG` is unset.
    pub debug: bool,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[must_use]
    pub const fn default_directive(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}
