//! Bot that lets the model call locally registered tools.

use std::fmt;
use std::sync::Arc;

use guard_adapters::{Invocation, Provider};
use guard_primitives::{ToolSpec, ensure_unique_names};
use guard_tools::ToolHandler;
use tracing::{info, warn};

use crate::error::BotResult;
use crate::unprotected::format_response;

/// Chat bot advertising a fixed tool set.
///
/// Tool support is resolved once at construction; providers without it are
/// invoked without tools or handler.
pub struct ToolBot {
    provider: Arc<dyn Provider>,
    system_prompt: String,
    specs: Vec<ToolSpec>,
    handler: ToolHandler,
    tools_enabled: bool,
}

impl fmt::Debug for ToolBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBot")
            .field("provider", &self.provider.metadata().name())
            .field("tools", &self.specs.iter().map(ToolSpec::name).collect::<Vec<_>>())
            .field("tools_enabled", &self.tools_enabled)
            .finish_non_exhaustive()
    }
}

impl ToolBot {
    /// Creates the bot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BotError::ToolSpec`] if two specs share a name.
    pub fn new(
        provider: Arc<dyn Provider>,
        system_prompt: impl Into<String>,
        specs: Vec<ToolSpec>,
        handler: ToolHandler,
    ) -> BotResult<Self> {
        ensure_unique_names(&specs)?;
        for spec in &specs {
            if !handler.has_tool(spec.name()) {
                warn!(tool = spec.name(), "advertised tool has no registered handler");
            }
        }

        let tools_enabled = provider.supports_tools();
        if !tools_enabled {
            info!(
                provider = provider.metadata().name(),
                "provider does not support tools; chatting without them"
            );
        }

        Ok(Self {
            provider,
            system_prompt: system_prompt.into(),
            specs,
            handler,
            tools_enabled,
        })
    }

    /// Whether tools are passed to the provider.
    #[must_use]
    pub const fn tools_enabled(&self) -> bool {
        self.tools_enabled
    }

    /// Sends one prompt and returns the formatted response block.
    ///
    /// # Errors
    ///
    /// Propagates provider failures. Tool failures are reported to the model
    /// instead.
    pub async fn chat(&self, user_prompt: &str) -> BotResult<String> {
        let mut invocation = Invocation::new(&self.system_prompt, user_prompt);
        if self.tools_enabled {
            invocation = invocation.with_tools(&self.specs).with_handler(&self.handler);
        }
        let completion = self.provider.invoke(invocation).await?;
        Ok(format_response(completion.text(), Some(completion.usage())))
    }
}
