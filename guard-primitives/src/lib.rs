//! Core shared types for provider-agnostic LLM invocation.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod message;
mod tool;
mod usage;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Caller-owned conversation history.
pub use message::{ContentBlock, ConversationMessage, Role};
/// Tool descriptions, requests, and outcomes.
pub use tool::{ParameterSpec, ToolCall, ToolResult, ToolSpec, ToolSpecBuilder, ensure_unique_names};
/// Token accounting normalised across backends.
pub use usage::{TokenUsage, format_token_usage};
