//! Bot with no protections, kept as a baseline for comparison.

use std::fmt;
use std::sync::Arc;

use guard_adapters::{Invocation, Provider};
use guard_policy::GuardSettings;
use guard_primitives::{TokenUsage, format_token_usage};

use crate::error::BotResult;

/// Renders a response block with a header and trailing usage line.
#[must_use]
pub fn format_response(text: &str, usage: Option<&TokenUsage>) -> String {
    format!(
        "\nLLM Response:\n{}\n{text}\n\n{}",
        "-".repeat(40),
        format_token_usage(usage)
    )
}

/// Chat bot using the unprotected system prompt.
pub struct UnprotectedBot {
    provider: Arc<dyn Provider>,
    system_prompt: String,
}

impl fmt::Debug for UnprotectedBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnprotectedBot")
            .field("provider", &self.provider.metadata().name())
            .finish_non_exhaustive()
    }
}

impl UnprotectedBot {
    /// Creates the bot.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, settings: &GuardSettings) -> Self {
        Self {
            provider,
            system_prompt: settings.unprotected_system_prompt(),
        }
    }

    /// Returns the system prompt in use.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Sends one prompt and returns the formatted response block.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn chat(&self, user_prompt: &str) -> BotResult<String> {
        let completion = self
            .provider
            .invoke(Invocation::new(&self.system_prompt, user_prompt))
            .await?;
        Ok(format_response(completion.text(), Some(completion.usage())))
    }
}
