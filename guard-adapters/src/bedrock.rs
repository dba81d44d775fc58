//! Amazon Bedrock Converse provider.
//!
//! Authenticates with a Bedrock API key sent as a bearer token.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use guard_primitives::{ContentBlock, ConversationMessage, Role, TokenUsage, ToolCall, ToolResult, ToolSpec};
use hyper::header::AUTHORIZATION;
use serde_json::{Map, Value, json};

use crate::config::ProviderConfig;
use crate::http_client::HttpTransport;
use crate::invocation::{self, WireFormat, count};
use crate::tool_adapter::ToolAdapter;
use crate::traits::{
    AdapterResult, ChatTransport, Completion, InferenceParams, Invocation, Provider,
    ProviderMetadata,
};

/// Environment variable holding the Bedrock API key.
pub const BEDROCK_API_KEY_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";
/// Environment variable overriding the region.
pub const BEDROCK_REGION_ENV: &str = "AWS_REGION";
/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "eu-central-1";
/// Default display name.
pub const DEFAULT_NAME: &str = "Bedrock-Claude-Converse";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Tool adapter for the Converse API.
#[derive(Clone, Copy, Debug, Default)]
pub struct BedrockToolAdapter;

impl ToolAdapter for BedrockToolAdapter {
    fn convert_tools(&self, specs: &[ToolSpec]) -> Vec<Value> {
        specs
            .iter()
            .map(|spec| {
                json!({
                    "toolSpec": {
                        "name": spec.name(),
                        "description": spec.description(),
                        "inputSchema": { "json": spec.input_schema() },
                    }
                })
            })
            .collect()
    }

    fn extract_tool_calls(&self, response: &Value) -> Vec<ToolCall> {
        content_blocks(response)
            .iter()
            .filter_map(|block| block.get("toolUse"))
            .filter_map(|tool_use| {
                let id = tool_use.get("toolUseId")?.as_str()?;
                let name = tool_use.get("name")?.as_str()?;
                let input = tool_use.get("input").cloned().unwrap_or_else(|| json!({}));
                Some(ToolCall::new(id, name, input))
            })
            .collect()
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        results
            .iter()
            .map(|result| {
                json!({
                    "toolResult": {
                        "toolUseId": result.tool_call_id(),
                        "content": [{ "text": result.content() }],
                    }
                })
            })
            .collect()
    }
}

fn content_blocks(response: &Value) -> &[Value] {
    response
        .pointer("/output/message/content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Provider calling `POST /model/{modelId}/converse`.
pub struct BedrockProvider {
    metadata: ProviderMetadata,
    params: InferenceParams,
    transport: Arc<dyn ChatTransport>,
    adapter: BedrockToolAdapter,
}

impl fmt::Debug for BedrockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BedrockProvider")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl BedrockProvider {
    /// Configuration from the environment with the default model.
    #[must_use]
    pub fn default_config() -> ProviderConfig {
        let region = std::env::var(BEDROCK_REGION_ENV)
            .ok()
            .filter(|region| !region.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_owned());
        ProviderConfig::from_env(DEFAULT_NAME, DEFAULT_MODEL, BEDROCK_API_KEY_ENV)
            .with_region(region)
            .with_params(InferenceParams::converse())
    }

    /// Creates a provider talking to Bedrock over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Configuration`] if the API key is
    /// missing or the endpoint cannot be built.
    pub fn new(config: ProviderConfig) -> AdapterResult<Self> {
        let api_key = config.require_api_key("Bedrock")?;
        let transport = HttpTransport::new(&endpoint(&config), "Bedrock")?
            .with_header(AUTHORIZATION, &format!("Bearer {api_key}"))?
            .with_timeout(config.timeout)
            .with_max_attempts(config.max_attempts);
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a provider over an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            metadata: ProviderMetadata::new(config.name, "bedrock", config.model),
            params: config.params,
            transport,
            adapter: BedrockToolAdapter,
        }
    }

    fn encode_block(&self, block: &ContentBlock) -> Option<Value> {
        match block {
            ContentBlock::Text { text } if text.is_empty() => None,
            ContentBlock::Text { text } => Some(json!({ "text": text })),
            ContentBlock::ToolCall(call) => Some(json!({
                "toolUse": {
                    "toolUseId": call.id(),
                    "name": call.name(),
                    "input": call.input(),
                }
            })),
            ContentBlock::ToolResult(result) => self
                .adapter
                .format_tool_results(std::slice::from_ref(result))
                .into_iter()
                .next(),
        }
    }
}

fn endpoint(config: &ProviderConfig) -> String {
    let region = config.region.as_deref().unwrap_or(DEFAULT_REGION);
    let default_base = format!("https://bedrock-runtime.{region}.amazonaws.com/");
    let base = config.base_url_or(&default_base);
    format!("{base}model/{}/converse", encode_path_segment(&config.model))
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

impl WireFormat for BedrockProvider {
    fn identity(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn adapter(&self) -> &dyn ToolAdapter {
        &self.adapter
    }

    fn encode_message(&self, message: &ConversationMessage) -> Vec<Value> {
        let role = match message.role() {
            Role::Assistant => "assistant",
            Role::User | Role::Tool => "user",
        };
        let content: Vec<Value> = message
            .content()
            .iter()
            .filter_map(|block| self.encode_block(block))
            .collect();
        if content.is_empty() {
            return Vec::new();
        }
        vec![json!({ "role": role, "content": content })]
    }

    fn build_payload(&self, system_prompt: &str, messages: Vec<Value>, tools: &[Value]) -> Value {
        let mut payload = Map::new();
        payload.insert("messages".into(), Value::Array(messages));
        if !system_prompt.is_empty() {
            payload.insert("system".into(), json!([{ "text": system_prompt }]));
        }
        payload.insert(
            "inferenceConfig".into(),
            json!({
                "maxTokens": self.params.max_tokens,
                "temperature": self.params.temperature,
                "topP": self.params.top_p,
                "stopSequences": self.params.stop_sequences,
            }),
        );
        if !tools.is_empty() {
            payload.insert("toolConfig".into(), json!({ "tools": tools }));
        }
        Value::Object(payload)
    }

    fn completion_text(&self, response: &Value) -> String {
        content_blocks(response)
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect()
    }

    fn token_usage(&self, response: &Value) -> TokenUsage {
        let usage = response.get("usage").unwrap_or(&Value::Null);
        TokenUsage::new(
            count(usage, "inputTokens"),
            count(usage, "outputTokens"),
            self.metadata.name(),
        )
    }
}

#[async_trait]
impl Provider for BedrockProvider {
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
