//! Token accounting normalised across backends.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token counts reported by a backend for one invocation.
///
/// The total is always derived from the two counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    input_tokens: u64,
    output_tokens: u64,
    provider_name: String,
}

impl TokenUsage {
    /// Creates a usage record tagged with the reporting provider.
    #[must_use]
    pub fn new(input_tokens: u64, output_tokens: u64, provider_name: impl Into<String>) -> Self {
        Self {
            input_tokens,
            output_tokens,
            provider_name: provider_name.into(),
        }
    }

    /// Zero usage, used when no call was made or the backend reported nothing.
    #[must_use]
    pub fn empty(provider_name: impl Into<String>) -> Self {
        Self::new(0, 0, provider_name)
    }

    /// Prompt-side tokens.
    #[must_use]
    pub const fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    /// Completion-side tokens.
    #[must_use]
    pub const fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    /// Sum of input and output tokens.
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Name of the provider that produced the counts.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tokens: {} + {} = {} ({})",
            self.input_tokens,
            self.output_tokens,
            self.total_tokens(),
            self.provider_name
        )
    }
}

/// Renders the usage line appended to delivered responses.
#[must_use]
pub fn format_token_usage(usage: Option<&TokenUsage>) -> String {
    usage.map_or_else(|| "Tokens: unavailable".to_owned(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_derived_total() {
        let usage = TokenUsage::new(12, 30, "GPT4o-OpenAI");
        assert_eq!(usage.total_tokens(), 42);
        assert_eq!(usage.to_string(), "Tokens: 12 + 30 = 42 (GPT4o-OpenAI)");
    }

    #[test]
    fn missing_usage_is_reported_as_unavailable() {
        assert_eq!(format_token_usage(None), "Tokens: unavailable");
        assert_eq!(
            format_token_usage(Some(&TokenUsage::empty("Llama-Groq"))),
            "Tokens: 0 + 0 = 0 (Llama-Groq)"
        );
    }
}
