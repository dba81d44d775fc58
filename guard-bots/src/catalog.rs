//! Provider handles built from configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use guard_adapters::{
    AdapterError, AnthropicProvider, BedrockProvider, GroqProvider, OpenAiProvider, Provider,
    ProviderConfig,
};
use guard_config::{GuardConfig, schema::KNOWN_BACKENDS};
use tracing::{info, warn};

use crate::error::{BotError, BotResult};

/// Named provider handles plus the configured default.
///
/// Built once at start-up and passed to bots explicitly.
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    default: Option<String>,
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("providers", &self.names())
            .field("default", &self.default)
            .finish()
    }
}

impl ProviderCatalog {
    /// Builds every enabled backend, reading API keys from the environment.
    ///
    /// Backends whose key is missing are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::Config`] if an override cannot be applied, or
    /// [`BotError::Provider`] if a backend with a key fails to build.
    pub fn from_config(config: &GuardConfig) -> BotResult<Self> {
        Self::from_config_with(config, default_config)
    }

    /// Like [`ProviderCatalog::from_config`] with caller-supplied base
    /// configurations per backend key.
    ///
    /// # Errors
    ///
    /// See [`ProviderCatalog::from_config`].
    pub fn from_config_with<F>(config: &GuardConfig, mut base: F) -> BotResult<Self>
    where
        F: FnMut(&str) -> ProviderConfig,
    {
        config.validate()?;
        let mut catalog = Self {
            providers: BTreeMap::new(),
            default: Some(config.providers.default_provider.clone()),
        };

        for key in KNOWN_BACKENDS {
            let Some(settings) = config.providers.backend(key) else {
                continue;
            };
            if !settings.enabled {
                info!(backend = key, "backend disabled");
                continue;
            }

            let provider_config = settings.apply(base(key))?;
            if !provider_config.has_api_key() {
                warn!(backend = key, "no API key in the environment; backend skipped");
                continue;
            }
            let provider = build_provider(key, provider_config)?;
            info!(backend = key, provider = %provider.metadata(), "backend ready");
            catalog.insert(key, provider);
        }

        Ok(catalog)
    }

    /// Registers or replaces a provider under `key`.
    pub fn insert(&mut self, key: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(key.into(), provider);
    }

    /// Sets the key returned by [`ProviderCatalog::default_provider`].
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>) -> Self {
        self.default = Some(key.into());
        self
    }

    /// Looks up a provider by backend key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(key).cloned()
    }

    /// Looks up a provider, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::UnknownProvider`] if nothing is registered under
    /// `key`.
    pub fn require(&self, key: &str) -> BotResult<Arc<dyn Provider>> {
        self.get(key).ok_or_else(|| BotError::UnknownProvider {
            name: key.to_owned(),
        })
    }

    /// Returns the configured default provider.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::UnknownProvider`] if the default was not built.
    pub fn default_provider(&self) -> BotResult<Arc<dyn Provider>> {
        self.require(self.default.as_deref().unwrap_or_default())
    }

    /// Registered backend keys in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Whether no provider was built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn default_config(key: &str) -> ProviderConfig {
    match key {
        "bedrock" => BedrockProvider::default_config(),
        "openai" => OpenAiProvider::default_config(),
        "groq" => GroqProvider::default_config(),
        _ => AnthropicProvider::default_config(),
    }
}

fn build_provider(key: &str, config: ProviderConfig) -> Result<Arc<dyn Provider>, AdapterError> {
    Ok(match key {
        "bedrock" => Arc::new(BedrockProvider::new(config)?),
        "openai" => Arc::new(OpenAiProvider::new(config)?),
        "groq" => Arc::new(GroqProvider::new(config)?),
        "anthropic" => Arc::new(AnthropicProvider::new(config)?),
        other => {
            return Err(AdapterError::configuration(format!(
                "unknown backend `{other}`"
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyless(key: &str) -> ProviderConfig {
        ProviderConfig::new(format!("{key}-test"), "model")
    }

    fn keyed(key: &str) -> ProviderConfig {
        keyless(key).with_api_key("secret")
    }

    #[test]
    fn builds_enabled_backends_with_keys() {
        let mut config = GuardConfig::default();
        config.providers.default_provider = "groq".into();
        config.providers.anthropic.enabled = false;

        let catalog = ProviderCatalog::from_config_with(&config, keyed).unwrap();

        assert_eq!(catalog.names(), vec!["bedrock", "groq", "openai"]);
        let default = catalog.default_provider().unwrap();
        assert_eq!(default.metadata().name(), "groq-test");
        assert_eq!(default.metadata().backend(), "groq");
    }

    #[test]
    fn missing_keys_skip_backends() {
        let catalog =
            ProviderCatalog::from_config_with(&GuardConfig::default(), keyless).unwrap();

        assert!(catalog.is_empty());
        let Err(err) = catalog.default_provider() else {
            panic!("nothing was built");
        };
        assert!(matches!(err, BotError::UnknownProvider { ref name } if name == "bedrock"));
    }

    #[test]
    fn overrides_are_applied() {
        let mut config = GuardConfig::default();
        config.providers.openai.model = Some("gpt-4o".into());
        config.providers.openai.name = Some("Custom".into());

        let catalog = ProviderCatalog::from_config_with(&config, keyed).unwrap();
        let openai = catalog.require("openai").unwrap();

        assert_eq!(openai.metadata().name(), "Custom");
        assert_eq!(openai.metadata().model(), "gpt-4o");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let mut config = GuardConfig::default();
        config.providers.groq.base_url = Some("not a url".into());

        let err = ProviderCatalog::from_config_with(&config, keyed).expect_err("bad url");
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn malformed_key_is_an_error_not_a_skip() {
        let config = GuardConfig::default();

        let err = ProviderCatalog::from_config_with(&config, |key: &str| {
            keyless(key).with_api_key("bad\nkey")
        })
        .expect_err("header value is invalid");

        assert!(matches!(
            err,
            BotError::Provider(AdapterError::Configuration { .. })
        ));
    }

    #[test]
    fn unknown_default_is_rejected() {
        let mut config = GuardConfig::default();
        config.providers.default_provider = "mistral".into();

        let err = ProviderCatalog::from_config_with(&config, keyed).expect_err("unknown");
        assert!(matches!(err, BotError::Config(_)));
    }
}
