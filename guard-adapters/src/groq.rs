//! Groq provider speaking the `OpenAI`-compatible chat-completions dialect.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use guard_primitives::{ConversationMessage, TokenUsage, ToolCall, ToolResult, ToolSpec};
use hyper::header::AUTHORIZATION;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::http_client::HttpTransport;
use crate::invocation::{self, WireFormat};
use crate::openai::{
    OpenAiToolAdapter, chat_completion_text, chat_payload, chat_usage, encode_chat_message,
};
use crate::tool_adapter::ToolAdapter;
use crate::traits::{
    AdapterResult, ChatTransport, Completion, InferenceParams, Invocation, Provider,
    ProviderMetadata,
};

/// Environment variable used when loading configuration automatically.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/";
/// Default display name.
pub const DEFAULT_NAME: &str = "Llama-Groq";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Tool adapter for Groq. Shares the `OpenAI` function-tool shapes.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroqToolAdapter {
    inner: OpenAiToolAdapter,
}

impl ToolAdapter for GroqToolAdapter {
    fn convert_tools(&self, specs: &[ToolSpec]) -> Vec<Value> {
        self.inner.convert_tools(specs)
    }

    fn extract_tool_calls(&self, response: &Value) -> Vec<ToolCall> {
        self.inner.extract_tool_calls(response)
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        self.inner.format_tool_results(results)
    }
}

/// Groq provider.
pub struct GroqProvider {
    metadata: ProviderMetadata,
    params: InferenceParams,
    transport: Arc<dyn ChatTransport>,
    adapter: GroqToolAdapter,
}

impl fmt::Debug for GroqProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqProvider")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl GroqProvider {
    /// Configuration from `GROQ_API_KEY` with the default model.
    #[must_use]
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::from_env(DEFAULT_NAME, DEFAULT_MODEL, GROQ_API_KEY_ENV)
    }

    /// Creates a provider talking to Groq over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Configuration`] if the API key is
    /// missing or the endpoint is invalid.
    pub fn new(config: ProviderConfig) -> AdapterResult<Self> {
        let api_key = config.require_api_key("Groq")?;
        let endpoint = format!("{}v1/chat/completions", config.base_url_or(DEFAULT_BASE_URL));
        let transport = HttpTransport::new(&endpoint, "Groq")?
            .with_header(AUTHORIZATION, &format!("Bearer {api_key}"))?
            .with_timeout(config.timeout)
            .with_max_attempts(config.max_attempts);
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a provider over an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            metadata: ProviderMetadata::new(config.name, "groq", config.model),
            params: config.params,
            transport,
            adapter: GroqToolAdapter::default(),
        }
    }
}

impl WireFormat for GroqProvider {
    fn identity(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn adapter(&self) -> &dyn ToolAdapter {
        &self.adapter
    }

    fn encode_message(&self, message: &ConversationMessage) -> Vec<Value> {
        encode_chat_message(&self.adapter, message)
    }

    fn build_payload(&self, system_prompt: &str, messages: Vec<Value>, tools: &[Value]) -> Value {
        chat_payload(
            self.metadata.model(),
            &self.params,
            "max_completion_tokens",
            system_prompt,
            messages,
            tools,
        )
    }

    fn completion_text(&self, response: &Value) -> String {
        chat_completion_text(response)
    }

    fn token_usage(&self, response: &Value) -> TokenUsage {
        chat_usage(response, self.metadata.name())
    }
}

#[async_trait]
impl Provider for GroqProvider {
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
