//! Local tool registry used to execute model-requested tool calls.
//!
//! Tools are plain synchronous functions over JSON. Any failure raised while
//! running one, including a panic, is contained by [`ToolHandler::dispatch`]
//! and reported as a failed [`guard_primitives::ToolResult`].

#![warn(missing_docs, clippy::pedantic)]

pub mod handler;

pub use handler::{Result, ToolError, ToolFunction, ToolHandler};
