//! Construction-time settings shared by every provider.

use std::{env, fmt, time::Duration};

use crate::http_client::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, sanitize_base_url};
use crate::traits::{AdapterError, AdapterResult, InferenceParams};

/// Configuration for one provider instance.
#[derive(Clone)]
pub struct ProviderConfig {
    pub(crate) name: String,
    pub(crate) model: String,
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) region: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) max_attempts: u32,
    pub(crate) params: InferenceParams,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Creates a configuration for the given display name and model.
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            region: None,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            params: InferenceParams::default(),
        }
    }

    /// Loads the API key from `key_var` when it is set and non-empty.
    #[must_use]
    pub fn from_env(name: impl Into<String>, model: impl Into<String>, key_var: &str) -> Self {
        let mut cfg = Self::new(name, model);
        cfg.api_key = env::var(key_var).ok().filter(|key| !key.trim().is_empty());
        cfg
    }

    /// Replaces the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = Some(sanitize_base_url(base_url.as_ref())?);
        Ok(self)
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the cloud region (Bedrock only).
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many times connect and timeout failures are attempted.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replaces the fixed inference parameters.
    #[must_use]
    pub fn with_params(mut self, params: InferenceParams) -> Self {
        self.params = params;
        self
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key is available.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn require_api_key(&self, backend: &str) -> AdapterResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AdapterError::configuration(format!("{backend} provider requires an API key"))
        })
    }

    pub(crate) fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.base_url.as_deref().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_requires_scheme() {
        let err = ProviderConfig::new("GPT4o-OpenAI", "gpt-4o-mini")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");

        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = ProviderConfig::new("Llama-Groq", "llama-3.3-70b-versatile").with_api_key("gsk_secret");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let cfg = ProviderConfig::new("Llama-Groq", "llama-3.3-70b-versatile");
        assert!(!cfg.has_api_key());
        assert!(matches!(
            cfg.require_api_key("Groq"),
            Err(AdapterError::Configuration { .. })
        ));
    }
}
