//! Role-tagged conversation history owned by the caller.

use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// End-user input.
    User,
    /// Model output, including tool-call requests.
    Assistant,
    /// Tool results threaded back to the model.
    Tool,
}

/// One piece of content inside a [`ConversationMessage`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// Text body.
        text: String,
    },
    /// A tool invocation requested by the model.
    ToolCall(ToolCall),
    /// The outcome of a previously requested tool call.
    ToolResult(ToolResult),
}

impl ContentBlock {
    /// Convenience constructor for a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the text body for text blocks.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Ordered, role-tagged content blocks making up one conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    role: Role,
    content: Vec<ContentBlock>,
}

impl ConversationMessage {
    /// Creates a message from explicit blocks.
    #[must_use]
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    /// Creates a single-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    /// Creates a single-text assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentBlock::text(text)])
    }

    /// Creates a tool-result message holding every result of one round.
    #[must_use]
    pub fn tool_results(results: &[ToolResult]) -> Self {
        Self::new(
            Role::Tool,
            results.iter().cloned().map(ContentBlock::ToolResult).collect(),
        )
    }

    /// Returns the author role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the content blocks in order.
    #[must_use]
    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }

    /// Concatenates the text blocks of this message.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.iter().filter_map(ContentBlock::as_text).collect()
    }

    /// Iterates the tool-call requests carried by this message.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolCall(call) => Some(call),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_skips_non_text_blocks() {
        let message = ConversationMessage::new(
            Role::Assistant,
            vec![
                ContentBlock::text("Let me "),
                ContentBlock::ToolCall(ToolCall::new("a", "calc", json!({}))),
                ContentBlock::text("check."),
            ],
        );

        assert_eq!(message.text(), "Let me check.");
        assert_eq!(message.tool_calls().count(), 1);
    }

    #[test]
    fn tool_results_message_preserves_order() {
        let results = [
            ToolResult::success("a", &json!(3)),
            ToolResult::failure("b", "boom"),
        ];
        let message = ConversationMessage::tool_results(&results);

        assert_eq!(message.role(), Role::Tool);
        let ids: Vec<_> = message
            .content()
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult(result) => Some(result.tool_call_id()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
