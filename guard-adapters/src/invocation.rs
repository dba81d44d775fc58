//! Backend-agnostic invocation loop with a single tool round-trip.

use guard_primitives::{ContentBlock, ConversationMessage, Role, TokenUsage, ToolCall, ToolResult};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::tool_adapter::ToolAdapter;
use crate::traits::{AdapterResult, ChatTransport, Completion, Invocation, ProviderMetadata};

/// Backend-specific encoding used by [`run`].
pub(crate) trait WireFormat: Send + Sync {
    fn identity(&self) -> &ProviderMetadata;

    fn adapter(&self) -> &dyn ToolAdapter;

    /// Encodes one neutral message as zero or more wire messages.
    fn encode_message(&self, message: &ConversationMessage) -> Vec<Value>;

    /// Builds the request body. `tools` is empty when none are advertised.
    fn build_payload(&self, system_prompt: &str, messages: Vec<Value>, tools: &[Value]) -> Value;

    /// Concatenates the text blocks of a response.
    fn completion_text(&self, response: &Value) -> String;

    fn token_usage(&self, response: &Value) -> TokenUsage;
}

/// Runs one `invoke` call against `transport`.
pub(crate) async fn run(
    wire: &dyn WireFormat,
    transport: &dyn ChatTransport,
    invocation: Invocation<'_>,
) -> AdapterResult<Completion> {
    let metadata = wire.identity();
    let Invocation {
        system_prompt,
        user_prompt,
        tools,
        handler,
        history,
    } = invocation;

    let has_history = history.as_ref().is_some_and(|history| !history.is_empty());
    let prompt_is_blank = user_prompt.trim().is_empty();
    if prompt_is_blank && !has_history {
        debug!(provider = metadata.name(), "blank prompt without history; skipping call");
        return Ok(Completion::empty(metadata.name()));
    }

    let mut conversation = history.as_deref().cloned().unwrap_or_default();
    let prior_len = conversation.len();
    if !prompt_is_blank {
        conversation.push(ConversationMessage::user(user_prompt));
    }

    let wire_tools = if tools.is_empty() {
        Vec::new()
    } else {
        wire.adapter().convert_tools(tools)
    };

    let response = send(wire, transport, system_prompt, &conversation, &wire_tools).await?;
    let calls = wire.adapter().extract_tool_calls(&response);

    let mut tool_results = Vec::new();
    let response = match handler {
        Some(handler) if !calls.is_empty() => {
            info!(
                provider = metadata.name(),
                tool_calls = calls.len(),
                "executing requested tools"
            );
            tool_results = calls.iter().map(|call| handler.dispatch(call)).collect();

            conversation.push(assistant_turn(wire.completion_text(&response), &calls));
            conversation.push(ConversationMessage::tool_results(&tool_results));

            let follow_up = send(wire, transport, system_prompt, &conversation, &wire_tools).await?;
            let unanswered = wire.adapter().extract_tool_calls(&follow_up).len();
            if unanswered > 0 {
                warn!(
                    provider = metadata.name(),
                    tool_calls = unanswered,
                    "follow-up requested more tools; returning it unexecuted"
                );
            }
            follow_up
        }
        _ => {
            if !calls.is_empty() {
                debug!(
                    provider = metadata.name(),
                    tool_calls = calls.len(),
                    "tool calls requested without a handler"
                );
            }
            response
        }
    };

    let text = wire.completion_text(&response);
    let usage = wire.token_usage(&response);
    debug!(
        provider = metadata.name(),
        input_tokens = usage.input_tokens(),
        output_tokens = usage.output_tokens(),
        "invocation complete"
    );

    // Turns without an assistant reply are not mirrored, so the history
    // keeps alternating user and assistant roles.
    if let Some(history) = history {
        if text.is_empty() {
            debug!(provider = metadata.name(), "no assistant text; history left unchanged");
        } else {
            conversation.push(ConversationMessage::assistant(text.clone()));
            history.extend(conversation.drain(prior_len..));
        }
    }

    Ok(Completion::new(text, usage).with_tool_results(tool_results))
}

async fn send(
    wire: &dyn WireFormat,
    transport: &dyn ChatTransport,
    system_prompt: &str,
    conversation: &[ConversationMessage],
    tools: &[Value],
) -> AdapterResult<Value> {
    let messages: Vec<Value> = conversation
        .iter()
        .flat_map(|message| wire.encode_message(message))
        .collect();
    debug!(
        provider = wire.identity().name(),
        model = wire.identity().model(),
        messages = messages.len(),
        tools = tools.len(),
        "sending chat request"
    );
    let payload = wire.build_payload(system_prompt, messages, tools);
    transport.send(&payload).await
}

fn assistant_turn(text: String, calls: &[ToolCall]) -> ConversationMessage {
    let mut content = Vec::with_capacity(calls.len() + 1);
    if !text.is_empty() {
        content.push(ContentBlock::text(text));
    }
    content.extend(calls.iter().cloned().map(ContentBlock::ToolCall));
    ConversationMessage::new(Role::Assistant, content)
}

/// Collects the tool results carried by a neutral message.
pub(crate) fn tool_results_of(message: &ConversationMessage) -> Vec<ToolResult> {
    message
        .content()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult(result) => Some(result.clone()),
            _ => None,
        })
        .collect()
}

/// Reads a non-negative integer field, treating absent values as zero.
pub(crate) fn count(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or_default()
}
