//! `OpenAI` chat-completions provider.
//!
//! The wire helpers here are shared with other backends that speak the
//! same chat-completions dialect.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use guard_primitives::{ConversationMessage, Role, TokenUsage, ToolCall, ToolResult, ToolSpec};
use hyper::header::AUTHORIZATION;
use serde_json::{Map, Value, json};

use crate::config::ProviderConfig;
use crate::http_client::HttpTransport;
use crate::invocation::{self, WireFormat, count, tool_results_of};
use crate::tool_adapter::ToolAdapter;
use crate::traits::{
    AdapterResult, ChatTransport, Completion, InferenceParams, Invocation, Provider,
    ProviderMetadata,
};

/// Environment variable used when loading configuration automatically.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/";
/// Default display name.
pub const DEFAULT_NAME: &str = "GPT4o-OpenAI";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Tool adapter for chat-completions `function` tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAiToolAdapter;

impl ToolAdapter for OpenAiToolAdapter {
    fn convert_tools(&self, specs: &[ToolSpec]) -> Vec<Value> {
        specs
            .iter()
            .map(|spec| {
                json!({
                    "type": "function",
                    "function": {
                        "name": spec.name(),
                        "description": spec.description(),
                        "parameters": spec.input_schema(),
                    }
                })
            })
            .collect()
    }

    fn extract_tool_calls(&self, response: &Value) -> Vec<ToolCall> {
        first_message(response)
            .and_then(|message| message.get("tool_calls"))
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default()
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<Value> {
        results
            .iter()
            .map(|result| {
                json!({
                    "tool_call_id": result.tool_call_id(),
                    "role": "tool",
                    "content": result.content(),
                })
            })
            .collect()
    }
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let id = call.get("id")?.as_str()?;
    let function = call.get("function")?;
    let name = function.get("name")?.as_str()?;
    let input = match function.get("arguments") {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        Some(other) => other.clone(),
        None => json!({}),
    };
    Some(ToolCall::new(id, name, input))
}

fn first_message(response: &Value) -> Option<&Value> {
    response.pointer("/choices/0/message")
}

/// Encodes a neutral message in the chat-completions shape.
pub(crate) fn encode_chat_message(
    adapter: &dyn ToolAdapter,
    message: &ConversationMessage,
) -> Vec<Value> {
    match message.role() {
        Role::User => vec![json!({ "role": "user", "content": message.text() })],
        Role::Assistant => {
            let text = message.text();
            let mut encoded = Map::new();
            encoded.insert("role".into(), json!("assistant"));
            encoded.insert(
                "content".into(),
                if text.is_empty() { Value::Null } else { Value::String(text) },
            );
            let calls: Vec<Value> = message
                .tool_calls()
                .map(|call| {
                    json!({
                        "id": call.id(),
                        "type": "function",
                        "function": {
                            "name": call.name(),
                            "arguments": call.input().to_string(),
                        }
                    })
                })
                .collect();
            if !calls.is_empty() {
                encoded.insert("tool_calls".into(), Value::Array(calls));
            }
            vec![Value::Object(encoded)]
        }
        Role::Tool => adapter.format_tool_results(&tool_results_of(message)),
    }
}

/// Builds a chat-completions body. `max_tokens_key` differs between vendors.
pub(crate) fn chat_payload(
    model: &str,
    params: &InferenceParams,
    max_tokens_key: &str,
    system_prompt: &str,
    messages: Vec<Value>,
    tools: &[Value],
) -> Value {
    let mut all_messages = Vec::with_capacity(messages.len() + 1);
    if !system_prompt.is_empty() {
        all_messages.push(json!({ "role": "system", "content": system_prompt }));
    }
    all_messages.extend(messages);

    let mut payload = Map::new();
    payload.insert("model".into(), json!(model));
    payload.insert("messages".into(), Value::Array(all_messages));
    payload.insert(max_tokens_key.into(), json!(params.max_tokens));
    payload.insert("temperature".into(), json!(params.temperature));
    payload.insert("top_p".into(), json!(params.top_p));
    payload.insert("stop".into(), json!(params.stop_sequences));
    if !tools.is_empty() {
        payload.insert("tools".into(), Value::Array(tools.to_vec()));
    }
    Value::Object(payload)
}

/// Text of the first choice; `null` content yields an empty string.
pub(crate) fn chat_completion_text(response: &Value) -> String {
    first_message(response)
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

pub(crate) fn chat_usage(response: &Value, provider_name: &str) -> TokenUsage {
    let usage = response.get("usage").unwrap_or(&Value::Null);
    TokenUsage::new(
        count(usage, "prompt_tokens"),
        count(usage, "completion_tokens"),
        provider_name,
    )
}

/// `OpenAI` provider that calls the official API over HTTPS.
pub struct OpenAiProvider {
    metadata: ProviderMetadata,
    params: InferenceParams,
    transport: Arc<dyn ChatTransport>,
    adapter: OpenAiToolAdapter,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Configuration from `OPENAI_API_KEY` with the default model.
    #[must_use]
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::from_env(DEFAULT_NAME, DEFAULT_MODEL, OPENAI_API_KEY_ENV)
    }

    /// Creates a provider talking to the chat-completions endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AdapterError::Configuration`] if the API key is
    /// missing or the endpoint is invalid.
    pub fn new(config: ProviderConfig) -> AdapterResult<Self> {
        let api_key = config.require_api_key("OpenAI")?;
        let endpoint = format!("{}v1/chat/completions", config.base_url_or(DEFAULT_BASE_URL));
        let transport = HttpTransport::new(&endpoint, "OpenAI")?
            .with_header(AUTHORIZATION, &format!("Bearer {api_key}"))?
            .with_timeout(config.timeout)
            .with_max_attempts(config.max_attempts);
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a provider over an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            metadata: ProviderMetadata::new(config.name, "openai", config.model),
            params: config.params,
            transport,
            adapter: OpenAiToolAdapter,
        }
    }
}

impl WireFormat for OpenAiProvider {
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
            "max_tokens",
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
impl Provider for OpenAiProvider {
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
    use guard_primitives::ParameterSpec;
    use guard_tools::{ToolError, ToolHandler};

    use super::*;
    use crate::AdapterError;
    use crate::scripted::ScriptedTransport;

    fn calculator() -> ToolSpec {
        ToolSpec::builder("calc", "Basic arithmetic")
            .required_parameter(
                "op",
                ParameterSpec::string().with_enum(["add", "mul"]),
            )
            .required_parameter("a", ParameterSpec::number().with_description("Left operand"))
            .build()
            .unwrap()
    }

    fn text_response(text: &str) -> Value {
        json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 4, "total_tokens": 13}
        })
    }

    fn tool_call_response() -> Value {
        json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "a", "type": "function", "function": {"name": "calc", "arguments": "{\"op\":\"add\"}"}},
                    {"id": "b", "type": "function", "function": {"name": "calc", "arguments": "{\"op\":\"mul\"}"}}
                ]
            }, "finish_reason": "tool_calls"}],
            "usage": {"prompt_tokens": 30, "completion_tokens": 12}
        })
    }

    fn provider(transport: &Arc<ScriptedTransport>) -> OpenAiProvider {
        OpenAiProvider::with_transport(
            ProviderConfig::new(DEFAULT_NAME, DEFAULT_MODEL),
            transport.clone(),
        )
    }

    #[test]
    fn convert_tools_uses_flat_function_shape() {
        let tools = OpenAiToolAdapter.convert_tools(&[calculator()]);

        assert_eq!(tools[0]["type"], "function");
        let function = &tools[0]["function"];
        assert_eq!(function["name"], "calc");
        assert_eq!(function["description"], "Basic arithmetic");
        assert_eq!(function["parameters"]["type"], "object");
        assert_eq!(function["parameters"]["required"], json!(["op", "a"]));
        assert_eq!(function["parameters"]["properties"]["op"]["enum"], json!(["add", "mul"]));
        assert_eq!(
            function["parameters"]["properties"]["a"]["description"],
            "Left operand"
        );
    }

    #[test]
    fn extract_tool_calls_decodes_arguments() {
        let calls = OpenAiToolAdapter.extract_tool_calls(&tool_call_response());

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id(), "a");
        assert_eq!(calls[0].name(), "calc");
        assert_eq!(calls[0].input(), &json!({"op": "add"}));
        assert_eq!(calls[1].id(), "b");
        assert!(OpenAiToolAdapter.extract_tool_calls(&text_response("hi")).is_empty());
    }

    #[test]
    fn malformed_arguments_are_passed_through_raw() {
        let response = json!({"choices": [{"message": {"tool_calls": [
            {"id": "x", "function": {"name": "calc", "arguments": "{not json"}}
        ]}}]});

        let calls = OpenAiToolAdapter.extract_tool_calls(&response);
        assert_eq!(calls[0].input(), &json!("{not json"));
    }

    #[test]
    fn format_tool_results_emits_tool_messages() {
        let fragments = OpenAiToolAdapter.format_tool_results(&[ToolResult::success("a", &json!("5"))]);
        assert_eq!(
            fragments,
            vec![json!({"tool_call_id": "a", "role": "tool", "content": "5"})]
        );
    }

    #[test]
    fn new_requires_api_key() {
        let err = OpenAiProvider::new(ProviderConfig::new(DEFAULT_NAME, DEFAULT_MODEL))
            .expect_err("missing key should error");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[tokio::test]
    async fn blank_prompt_skips_network() {
        let transport = Arc::new(ScriptedTransport::default());
        let provider = provider(&transport);

        let completion = provider.invoke(Invocation::new("sys", "   ")).await.unwrap();

        assert_eq!(completion.text(), "");
        assert_eq!(completion.usage().provider_name(), DEFAULT_NAME);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn payload_carries_system_prompt_and_params() {
        let transport = Arc::new(ScriptedTransport::new([text_response("hello")]));
        let provider = provider(&transport);

        let completion = provider.invoke(Invocation::new("be brief", "hi")).await.unwrap();
        assert_eq!(completion.text(), "hello");
        assert_eq!(completion.usage().total_tokens(), 13);

        let request = &transport.requests()[0];
        assert_eq!(request["model"], DEFAULT_MODEL);
        assert_eq!(request["messages"][0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(request["messages"][1], json!({"role": "user", "content": "hi"}));
        assert_eq!(request["max_tokens"], 1024);
        assert_eq!(request["stop"].as_array().map(Vec::len), Some(3));
        assert!(request.get("tools").is_none());
    }

    #[tokio::test]
    async fn tool_calls_without_handler_are_not_executed() {
        let transport = Arc::new(ScriptedTransport::new([tool_call_response()]));
        let provider = provider(&transport);
        let tools = [calculator()];

        let completion = provider
            .invoke(Invocation::new("sys", "compute").with_tools(&tools))
            .await
            .unwrap();

        assert_eq!(completion.text(), "");
        assert!(completion.tool_results().is_empty());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_failed_result() {
        let transport = Arc::new(ScriptedTransport::new([tool_call_response(), text_response("done")]));
        let provider = provider(&transport);
        let handler = ToolHandler::new();
        handler.register("other", |_: &Value| -> Result<Value, ToolError> { Ok(json!(null)) });
        let tools = [calculator()];

        let completion = provider
            .invoke(
                Invocation::new("sys", "compute")
                    .with_tools(&tools)
                    .with_handler(&handler),
            )
            .await
            .unwrap();

        assert_eq!(completion.text(), "done");
        assert!(completion.tool_results().iter().all(|result| !result.is_success()));

        let follow_up = &transport.requests()[1];
        let messages = follow_up["messages"].as_array().unwrap();
        // system, user, assistant tool-call turn, two tool messages
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2]["tool_calls"][1]["id"], "b");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], "{\"op\":\"add\"}");
        assert_eq!(messages[3]["tool_call_id"], "a");
        assert_eq!(messages[4]["tool_call_id"], "b");
        assert_eq!(messages[4]["content"], "Error: Unknown tool: calc");
    }

    #[tokio::test]
    async fn follow_up_tool_calls_are_returned_unexecuted() {
        let transport = Arc::new(ScriptedTransport::new([tool_call_response(), tool_call_response()]));
        let provider = provider(&transport);
        let handler = ToolHandler::new();
        handler.register("calc", |_: &Value| -> Result<Value, ToolError> { Ok(json!(1)) });
        let tools = [calculator()];

        let completion = provider
            .invoke(
                Invocation::new("sys", "compute")
                    .with_tools(&tools)
                    .with_handler(&handler),
            )
            .await
            .unwrap();

        assert_eq!(transport.request_count(), 2);
        assert_eq!(completion.tool_results().len(), 2);
        assert_eq!(completion.usage().input_tokens(), 30);
    }

    #[tokio::test]
    async fn history_is_appended_not_rewritten() {
        let transport = Arc::new(ScriptedTransport::new([text_response("Paris")]));
        let provider = provider(&transport);
        let mut history = vec![
            ConversationMessage::user("I am planning a trip."),
            ConversationMessage::assistant("Where to?"),
        ];

        provider
            .invoke(Invocation::new("sys", "Capital of France?").with_history(&mut history))
            .await
            .unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(history[0].text(), "I am planning a trip.");
        assert_eq!(history[2].text(), "Capital of France?");
        assert_eq!(history[3].role(), Role::Assistant);
        assert_eq!(history[3].text(), "Paris");
        assert_eq!(transport.requests()[0]["messages"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn transport_failure_leaves_history_untouched() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_error(AdapterError::transport("connection refused"));
        let provider = provider(&transport);
        let mut history = vec![ConversationMessage::user("earlier")];

        let err = provider
            .invoke(Invocation::new("sys", "again").with_history(&mut history))
            .await
            .expect_err("transport failure should surface");

        assert!(matches!(err, AdapterError::Transport { .. }));
        assert_eq!(history.len(), 1);
    }
}
