//! Shared provider traits, invocation requests, and error types.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use guard_primitives::{ConversationMessage, TokenUsage, ToolResult, ToolSpec};
use guard_tools::ToolHandler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tool_adapter::ToolAdapter;

/// Result alias used by providers and transports.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type shared by provider implementations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Provider is misconfigured or missing credentials.
    #[error("provider not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The request could not be encoded for the target backend.
    #[error("invalid invocation request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },

    /// Transport-level failures (network, TLS, timeout).
    #[error("provider transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The backend rejected the request due to rate limiting.
    #[error("provider rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The backend returned an error status or a malformed body.
    #[error("provider response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Identity of a configured provider instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderMetadata {
    name: String,
    backend: &'static str,
    model: String,
}

impl ProviderMetadata {
    /// Creates metadata for the supplied display name, backend and model.
    #[must_use]
    pub fn new(name: impl Into<String>, backend: &'static str, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend,
            model: model.into(),
        }
    }

    /// Display name used to tag token usage (e.g. `GPT4o-OpenAI`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend identifier (e.g. `openai`).
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        self.backend
    }

    /// Configured model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for ProviderMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.backend, self.model)
    }
}

/// Fixed sampling parameters sent with every request of a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceParams {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Sequences that terminate generation.
    pub stop_sequences: Vec<String>,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.5,
            top_p: 1.0,
            stop_sequences: ["\n\nHuman:", "\n\nAssistant", "</function_calls>"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl InferenceParams {
    /// Defaults used by the Bedrock Converse provider.
    #[must_use]
    pub fn converse() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            ..Self::default()
        }
    }
}

/// A single `invoke` request.
///
/// The optional history is owned by the caller; invocation only appends to it,
/// and only once the turn has completed without a transport failure.
pub struct Invocation<'a> {
    pub(crate) system_prompt: &'a str,
    pub(crate) user_prompt: &'a str,
    pub(crate) tools: &'a [ToolSpec],
    pub(crate) handler: Option<&'a ToolHandler>,
    pub(crate) history: Option<&'a mut Vec<ConversationMessage>>,
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("user_prompt", &self.user_prompt)
            .field("tools", &self.tools.len())
            .field("handler", &self.handler.is_some())
            .field("history", &self.history.as_ref().map(|history| history.len()))
            .finish_non_exhaustive()
    }
}

impl<'a> Invocation<'a> {
    /// Creates a request with a system prompt and a user prompt.
    #[must_use]
    pub fn new(system_prompt: &'a str, user_prompt: &'a str) -> Self {
        Self {
            system_prompt,
            user_prompt,
            tools: &[],
            handler: None,
            history: None,
        }
    }

    /// Advertises tools to the backend.
    #[must_use]
    pub fn with_tools(mut self, tools: &'a [ToolSpec]) -> Self {
        self.tools = tools;
        self
    }

    /// Supplies the handler used to execute requested tool calls.
    #[must_use]
    pub fn with_handler(mut self, handler: &'a ToolHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Continues an existing conversation.
    #[must_use]
    pub fn with_history(mut self, history: &'a mut Vec<ConversationMessage>) -> Self {
        self.history = Some(history);
        self
    }

    /// Returns the system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
    }

    /// Returns the user prompt.
    #[must_use]
    pub fn user_prompt(&self) -> &str {
        self.user_prompt
    }
}

/// Result of one `invoke` call.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    text: String,
    usage: TokenUsage,
    tool_results: Vec<ToolResult>,
}

impl Completion {
    /// Creates a completion.
    #[must_use]
    pub fn new(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            text: text.into(),
            usage,
            tool_results: Vec::new(),
        }
    }

    /// Sentinel returned when there is nothing to send.
    #[must_use]
    pub fn empty(provider_name: &str) -> Self {
        Self::new(String::new(), TokenUsage::empty(provider_name))
    }

    #[must_use]
    pub(crate) fn with_tool_results(mut self, tool_results: Vec<ToolResult>) -> Self {
        self.tool_results = tool_results;
        self
    }

    /// Concatenated text of the final response.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Token usage of the final response.
    #[must_use]
    pub fn usage(&self) -> &TokenUsage {
        &self.usage
    }

    /// Tool results produced during the turn, in request order.
    #[must_use]
    pub fn tool_results(&self) -> &[ToolResult] {
        &self.tool_results
    }

    /// Splits the completion into text and usage.
    #[must_use]
    pub fn into_parts(self) -> (String, TokenUsage) {
        (self.text, self.usage)
    }
}

/// Trait implemented by every LLM backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider identity.
    fn metadata(&self) -> &ProviderMetadata;

    /// Returns the tool adapter for this backend.
    fn tool_adapter(&self) -> &dyn ToolAdapter;

    /// Whether this provider can drive tool calls.
    fn supports_tools(&self) -> bool {
        self.tool_adapter().supports_tools()
    }

    /// Runs one turn, including at most one tool round-trip.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the backend cannot be reached or
    /// answers with an error. Tool failures never surface here.
    async fn invoke(&self, invocation: Invocation<'_>) -> AdapterResult<Completion>;
}

/// Sends one JSON payload to a backend and returns its JSON response.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Performs the request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Transport`] for network failures and
    /// [`AdapterError::Response`] or [`AdapterError::RateLimited`] when the
    /// backend rejects the request.
    async fn send(&self, payload: &Value) -> AdapterResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_chat_defaults() {
        let params = InferenceParams::default();
        assert_eq!(params.max_tokens, 1024);
        assert!((params.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(params.stop_sequences.len(), 3);

        let converse = InferenceParams::converse();
        assert!((converse.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(converse.stop_sequences, params.stop_sequences);
    }

    #[test]
    fn empty_completion_is_tagged_with_provider() {
        let completion = Completion::empty("Llama-Groq");
        assert!(completion.text().is_empty());
        assert_eq!(completion.usage().total_tokens(), 0);
        assert_eq!(completion.usage().provider_name(), "Llama-Groq");
    }

    #[test]
    fn metadata_display_includes_backend_and_model() {
        let metadata = ProviderMetadata::new("GPT4o-OpenAI", "openai", "gpt-4o-mini");
        assert_eq!(metadata.to_string(), "GPT4o-OpenAI (openai:gpt-4o-mini)");
    }
}
