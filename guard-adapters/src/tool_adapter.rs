//! Translation between provider-neutral tool types and backend wire shapes.

use guard_primitives::{ToolCall, ToolResult, ToolSpec};
use serde_json::Value;

/// Per-backend translation of tools, tool-call requests, and tool results.
pub trait ToolAdapter: Send + Sync {
    /// Converts tool specifications into the backend's native tool list.
    fn convert_tools(&self, specs: &[ToolSpec]) -> Vec<Value>;

    /// Extracts tool-call requests from a raw response, in backend order.
    ///
    /// Returns an empty list when the response requests no tools.
    fn extract_tool_calls(&self, response: &Value) -> Vec<ToolCall>;

    /// Formats tool results as fragments appendable to the conversation,
    /// one per result.
    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<Value>;

    /// Whether the backend can drive tool calls at all.
    fn supports_tools(&self) -> bool {
        true
    }
}

/// Adapter for backends without tool calling.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpToolAdapter;

impl ToolAdapter for NoOpToolAdapter {
    fn convert_tools(&self, _specs: &[ToolSpec]) -> Vec<Value> {
        Vec::new()
    }

    fn extract_tool_calls(&self, _response: &Value) -> Vec<ToolCall> {
        Vec::new()
    }

    fn format_tool_results(&self, _results: &[ToolResult]) -> Vec<Value> {
        Vec::new()
    }

    fn supports_tools(&self) -> bool {
        false
    }
}
