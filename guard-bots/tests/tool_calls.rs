use std::sync::Arc;

use guard_adapters::{
    BedrockProvider, Invocation, OpenAiProvider, Provider, ProviderConfig, ScriptedTransport,
};
use guard_bots::ToolBot;
use guard_primitives::{ConversationMessage, ParameterSpec, ToolSpec};
use guard_tools::{ToolError, ToolHandler};
use serde_json::{Value, json};

fn calculator_spec() -> ToolSpec {
    ToolSpec::builder("calculator", "Perform basic arithmetic")
        .required_parameter(
            "operation",
            ParameterSpec::string().with_enum(["add", "multiply"]),
        )
        .required_parameter("a", ParameterSpec::number())
        .required_parameter("b", ParameterSpec::number())
        .build()
        .unwrap()
}

fn calculator_handler() -> ToolHandler {
    let handler = ToolHandler::new();
    handler.register("calculator", |input: &Value| -> guard_tools::Result<Value> {
        let a = input["a"].as_i64().ok_or_else(|| ToolError::execution("a"))?;
        let b = input["b"].as_i64().ok_or_else(|| ToolError::execution("b"))?;
        match input["operation"].as_str() {
            Some("add") => Ok(json!(a + b)),
            Some("multiply") => Ok(json!(a * b)),
            other => Err(ToolError::execution(format!("unsupported operation {other:?}"))),
        }
    });
    handler
}

fn openai_tool_call(id: &str, name: &str, arguments: &Value) -> Value {
    json!({
        "id": id,
        "type": "function",
        "function": {"name": name, "arguments": arguments.to_string()}
    })
}

fn openai_provider(transport: &Arc<ScriptedTransport>) -> Arc<dyn Provider> {
    Arc::new(OpenAiProvider::with_transport(
        ProviderConfig::new("GPT4o-OpenAI", "gpt-4o-mini"),
        transport.clone(),
    ))
}

#[tokio::test]
async fn two_tool_calls_are_answered_in_one_follow_up() {
    let transport = Arc::new(ScriptedTransport::new([
        json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    openai_tool_call("a", "calculator", &json!({"operation": "add", "a": 2, "b": 3})),
                    openai_tool_call("b", "calculator", &json!({"operation": "multiply", "a": 4, "b": 5})),
                ]
            }}],
            "usage": {"prompt_tokens": 40, "completion_tokens": 12}
        }),
        json!({
            "choices": [{"message": {"role": "assistant", "content": "2 + 3 = 5 and 4 * 5 = 20"}}],
            "usage": {"prompt_tokens": 70, "completion_tokens": 15}
        }),
    ]));
    let bot = ToolBot::new(
        openai_provider(&transport),
        "You are a calculator assistant",
        vec![calculator_spec()],
        calculator_handler(),
    )
    .unwrap();

    let reply = bot.chat("What is 2 + 3 and 4 * 5?").await.unwrap();

    assert!(reply.contains("2 + 3 = 5 and 4 * 5 = 20"));
    assert!(reply.ends_with("Tokens: 70 + 15 = 85 (GPT4o-OpenAI)"));
    assert_eq!(transport.request_count(), 2);

    let requests = transport.requests();
    assert_eq!(requests[0]["tools"][0]["function"]["name"], "calculator");
    let follow_up = requests[1]["messages"].as_array().unwrap();
    let tool_messages: Vec<&Value> = follow_up.iter().filter(|m| m["role"] == "tool").collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0]["tool_call_id"], "a");
    assert_eq!(tool_messages[0]["content"], "5");
    assert_eq!(tool_messages[1]["tool_call_id"], "b");
    assert_eq!(tool_messages[1]["content"], "20");
}

#[tokio::test]
async fn unknown_tool_is_reported_to_the_model() {
    let transport = Arc::new(ScriptedTransport::new([
        json!({"choices": [{"message": {
            "role": "assistant",
            "content": null,
            "tool_calls": [openai_tool_call("x1", "weather", &json!({"city": "Paris"}))]
        }}]}),
        json!({"choices": [{"message": {"role": "assistant", "content": "I cannot check the weather."}}]}),
    ]));
    let handler = calculator_handler();
    let specs = [calculator_spec()];
    let mut history = Vec::new();

    let completion = openai_provider(&transport)
        .invoke(
            Invocation::new("system", "Weather in Paris?")
                .with_tools(&specs)
                .with_handler(&handler)
                .with_history(&mut history),
        )
        .await
        .unwrap();

    assert_eq!(completion.text(), "I cannot check the weather.");
    let [result] = completion.tool_results() else {
        panic!("expected one tool result");
    };
    assert!(!result.is_success());
    assert_eq!(result.content(), "Error: Unknown tool: weather");

    let follow_up = &transport.requests()[1]["messages"];
    assert_eq!(
        follow_up.as_array().unwrap().last().unwrap()["content"],
        "Error: Unknown tool: weather"
    );
    assert_eq!(
        history.last().map(ConversationMessage::text).as_deref(),
        Some("I cannot check the weather.")
    );
}

#[tokio::test]
async fn bedrock_round_trip_threads_tool_use_ids() {
    let transport = Arc::new(ScriptedTransport::new([
        json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "Let me calculate."},
                {"toolUse": {"toolUseId": "a", "name": "calculator", "input": {"operation": "add", "a": 1, "b": 1}}},
                {"toolUse": {"toolUseId": "b", "name": "calculator", "input": {"operation": "divide", "a": 1, "b": 1}}}
            ]}},
            "usage": {"inputTokens": 30, "outputTokens": 9}
        }),
        json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "1 + 1 = 2"}]}},
            "usage": {"inputTokens": 55, "outputTokens": 6}
        }),
    ]));
    let provider: Arc<dyn Provider> = Arc::new(BedrockProvider::with_transport(
        BedrockProvider::default_config(),
        transport.clone(),
    ));
    let bot = ToolBot::new(
        provider,
        "You are a calculator assistant",
        vec![calculator_spec()],
        calculator_handler(),
    )
    .unwrap();
    assert!(bot.tools_enabled());

    let reply = bot.chat("What is 1 + 1?").await.unwrap();

    assert!(reply.contains("1 + 1 = 2"));
    assert!(reply.ends_with("Tokens: 55 + 6 = 61 (Bedrock-Claude-Converse)"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0]["toolConfig"]["tools"][0]["toolSpec"]["inputSchema"]["json"]["required"],
        json!(["operation", "a", "b"])
    );
    let messages = requests[1]["messages"].as_array().unwrap();
    let results = &messages.last().unwrap()["content"];
    assert_eq!(results[0]["toolResult"]["toolUseId"], "a");
    assert_eq!(results[0]["toolResult"]["content"][0]["text"], "2");
    assert_eq!(results[1]["toolResult"]["toolUseId"], "b");
    assert!(
        results[1]["toolResult"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Error: tool execution failed")
    );
}
