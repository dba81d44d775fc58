//! Anthropic Messages provider without tool calling.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use guard_primitives::{ConversationMessage, Role, TokenUsage};
use hyper::header::HeaderName;
use serde_json::{Map, Value, json};

use crate::config::ProviderConfig;
use crate::http_client::HttpTransport;
use crate::invocation::{self, WireFormat, count};
use crate::tool_adapter::{NoOpToolAdapter, ToolAdapter};
use crate::traits::{
    AdapterResult, ChatTransport, Completion, InferenceParams, Invocation, Provider,
    ProviderMetadata,
};

/// Environment variable used when loading configuration automatically.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
/// Pinned API version header value.
pub const API_VERSION: &str = "2023-06-01";
/// Default display name.
pub const DEFAULT_NAME: &str = "Anthropic-Claude";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Anthropic provider. Text-only: driven through [`NoOpToolAdapter`].
pub struct AnthropicProvider {
    metadata: ProviderMetadata,
    params: InferenceParams,
    transport: Arc<dyn ChatTransport>,
    adapter: NoOpToolAdapter,
}

impl fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Configuration from `ANTHROPIC_API_KEY` with the default model.
    #[must_use]
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::from_env(DEFAULT_NAME, DEFAULT_MODEL, ANTHROPIC_API_KEY_ENV)
    }

    /// Creates a provider talking to the Messages API.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Configuration`] if the API key is
    /// missing or the endpoint is invalid.
    pub fn new(config: ProviderConfig) -> AdapterResult<Self> {
        let api_key = config.require_api_key("Anthropic")?;
        let endpoint = format!("{}v1/messages", config.base_url_or(DEFAULT_BASE_URL));
        let transport = HttpTransport::new(&endpoint, "Anthropic")?
            .with_header(HeaderName::from_static("x-api-key"), api_key)?
            .with_header(HeaderName::from_static("anthropic-version"), API_VERSION)?
            .with_timeout(config.timeout)
            .with_max_attempts(config.max_attempts);
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a provider over an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            metadata: ProviderMetadata::new(config.name, "anthropic", config.model),
            params: config.params,
            transport,
            adapter: NoOpToolAdapter,
        }
    }
}

impl WireFormat for AnthropicProvider {
    fn identity(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn adapter(&self) -> &dyn ToolAdapter {
        &self.adapter
    }

    fn encode_message(&self, message: &ConversationMessage) -> Vec<Value> {
        let role = match message.role() {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => return Vec::new(),
        };
        let text = message.text();
        if text.is_empty() {
            return Vec::new();
        }
        vec![json!({ "role": role, "content": text })]
    }

    fn build_payload(&self, system_prompt: &str, messages: Vec<Value>, _tools: &[Value]) -> Value {
        let mut payload = Map::new();
        payload.insert("model".into(), json!(self.metadata.model()));
        payload.insert("max_tokens".into(), json!(self.params.max_tokens));
        payload.insert("temperature".into(), json!(self.params.temperature));
        payload.insert("top_p".into(), json!(self.params.top_p));
        payload.insert("stop_sequences".into(), json!(self.params.stop_sequences));
        if !system_prompt.is_empty() {
            payload.insert("system".into(), json!(system_prompt));
        }
        payload.insert("messages".into(), Value::Array(messages));
        Value::Object(payload)
    }

    fn completion_text(&self, response: &Value) -> String {
        response
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn token_usage(&self, response: &Value) -> TokenUsage {
        let usage = response.get("usage").unwrap_or(&Value::Null);
        TokenUsage::new(
            count(usage, "input_tokens"),
            count(usage, "output_tokens"),
            self.metadata.name(),
        )
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn tool_adapter(&self) -> &dyn ToolAdapter {
        &self.adapter
    }

    async fn invoke(&self, invocation: Invocation<'_>) -> AdapterResult<Completion> {
        invocation::run(self, self.transport.as_ref(), invocation).await
    }
}

#[cfg(test)]
mod tests {
    use guard_primitives::{ParameterSpec, ToolSpec};
    use guard_tools::ToolHandler;

    use super::*;
    use crate::scripted::ScriptedTransport;

    #[tokio::test]
    async fn tools_are_ignored_without_special_casing() {
        let transport = Arc::new(ScriptedTransport::new([json!({
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "id": "t", "name": "calc", "input": {}},
                {"type": "text", "text": "there"}
            ],
            "usage": {"input_tokens": 5, "output_tokens": 2}
        })]));
        let provider = AnthropicProvider::with_transport(
            ProviderConfig::new(DEFAULT_NAME, DEFAULT_MODEL),
            transport.clone(),
        );
        let tools = [ToolSpec::builder("calc", "math")
            .parameter("a", ParameterSpec::number())
            .build()
            .unwrap()];
        let handler = ToolHandler::new();

        let completion = provider
            .invoke(
                Invocation::new("sys", "hi")
                    .with_tools(&tools)
                    .with_handler(&handler),
            )
            .await
            .unwrap();

        assert!(!provider.supports_tools());
        assert_eq!(completion.text(), "Hello there");
        assert_eq!(completion.usage().total_tokens(), 7);
        assert_eq!(transport.request_count(), 1);

        let request = &transport.requests()[0];
        assert_eq!(request["system"], "sys");
        assert_eq!(request["stop_sequences"].as_array().map(Vec::len), Some(3));
        assert!(request.get("tools").is_none());
    }
}
