//! Interactive comparison of unprotected, guarded, sandwiched, and
//! tool-enabled chat against a configured backend.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use llm_guard::bots::{ProviderCatalog, SecureBot, ToolBot, UnprotectedBot};
use llm_guard::config::GuardConfig;
use llm_guard::primitives::{ParameterSpec, ToolSpec};
use llm_guard::tools::{self, ToolError, ToolHandler};
use serde_json::{Value, json};
use tracing::info;

/// Which chat flow to run.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// No defences at all
    Unprotected,
    /// Guardrail raced against generation, plus canary check
    Guarded,
    /// Prompt wrapped with a trailing reminder
    Sandwich,
    /// Calculator tool exposed to the model
    Tools,
}

#[derive(Parser, Debug)]
#[command(name = "secure-chat")]
#[command(version, about = "Send one prompt through a guarded or unguarded chat flow")]
struct Cli {
    /// Prompt to send
    prompt: String,

    /// Chat flow
    #[arg(short, long, value_enum, default_value = "guarded")]
    mode: Mode,

    /// Backend key (bedrock, openai, groq, anthropic); defaults to the configured one
    #[arg(short, long)]
    provider: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GuardConfig::load(cli.config.as_deref()).context("loading configuration")?;
    llm_guard::telemetry::init(&config.logging)?;

    let catalog = ProviderCatalog::from_config(&config)?;
    if catalog.is_empty() {
        bail!("no provider is available; set an API key such as GROQ_API_KEY or OPENAI_API_KEY");
    }
    let provider = match &cli.provider {
        Some(key) => catalog.require(key)?,
        None => catalog.default_provider()?,
    };
    info!(provider = %provider.metadata(), mode = ?cli.mode, "starting chat");

    let settings = config.security.clone();
    let reply = match cli.mode {
        Mode::Unprotected => UnprotectedBot::new(provider, &settings).chat(&cli.prompt).await?,
        Mode::Guarded => {
            SecureBot::new(provider, settings)
                .chat_with_guardrail(&cli.prompt)
                .await?
        }
        Mode::Sandwich => {
            SecureBot::new(provider, settings)
                .chat_with_sandwich(&cli.prompt)
                .await?
        }
        Mode::Tools => {
            let bot = ToolBot::new(
                provider,
                "You are a helpful assistant. Use the calculator for arithmetic.",
                vec![calculator_spec()?],
                calculator_handler(),
            )?;
            bot.chat(&cli.prompt).await?
        }
    };

    println!("{reply}");
    Ok(())
}

fn calculator_spec() -> Result<ToolSpec> {
    Ok(ToolSpec::builder(
        "calculator",
        "Perform basic mathematical calculations like addition and multiplication.",
    )
    .required_parameter(
        "operation",
        ParameterSpec::string()
            .with_description("The mathematical operation to perform")
            .with_enum(["add", "multiply"]),
    )
    .required_parameter(
        "a",
        ParameterSpec::number().with_description("The first number"),
    )
    .required_parameter(
        "b",
        ParameterSpec::number().with_description("The second number"),
    )
    .build()?)
}

fn calculator_handler() -> ToolHandler {
    let handler = ToolHandler::new();
    handler.register("calculator", calculate);
    handler
}

fn calculate(input: &Value) -> tools::Result<Value> {
    let operand = |key: &str| {
        input
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::execution(format!("`{key}` must be a number")))
    };
    let (a, b) = (operand("a")?, operand("b")?);

    let result = match input.get("operation").and_then(Value::as_str) {
        Some("add") => a + b,
        Some("multiply") => a * b,
        Some(other) => return Ok(json!(format!("Unknown operation: {other}"))),
        None => return Err(ToolError::execution("`operation` is required")),
    };
    Ok(json!(result))
}
