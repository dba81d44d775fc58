//! Provider adapters for LLM backends.
//!
//! Each backend module exposes a [`Provider`] implementation and, where the
//! backend supports it, a [`ToolAdapter`] translating provider-neutral tool
//! types into its wire format. All providers share one invocation loop that
//! performs at most one tool round-trip per call.

#![warn(missing_docs, clippy::pedantic)]

pub mod anthropic;
pub mod bedrock;
pub mod config;
pub mod groq;
pub mod openai;
pub mod scripted;
pub mod tool_adapter;
pub mod traits;

mod http_client;
mod invocation;

pub use anthropic::AnthropicProvider;
pub use bedrock::{BedrockProvider, BedrockToolAdapter};
pub use config::ProviderConfig;
pub use groq::{GroqProvider, GroqToolAdapter};
pub use http_client::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, HttpTransport};
pub use openai::{OpenAiProvider, OpenAiToolAdapter};
pub use scripted::ScriptedTransport;
pub use tool_adapter::{NoOpToolAdapter, ToolAdapter};
pub use traits::{
    AdapterError, AdapterResult, ChatTransport, Completion, InferenceParams, Invocation, Provider,
    ProviderMetadata,
};
