//! Instruction-override classification backed by an LLM provider.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use guard_adapters::{Invocation, Provider};
use tracing::debug;

use crate::error::{GuardError, GuardResult};
use crate::verdict::GuardrailVerdict;

/// Trait implemented by guardrail classifiers.
#[async_trait]
pub trait GuardrailClassifier: Send + Sync {
    /// Classifies one user message.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Inconclusive`] when no verdict can be reached.
    async fn classify(&self, user_prompt: &str) -> GuardResult<GuardrailVerdict>;
}

/// Classifier that asks a provider to label the user message.
#[derive(Clone)]
pub struct LlmClassifier {
    provider: Arc<dyn Provider>,
    prompt: String,
}

impl fmt::Debug for LlmClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClassifier")
            .field("provider", &self.provider.metadata().name())
            .finish_non_exhaustive()
    }
}

impl LlmClassifier {
    /// Creates a classifier using `prompt` as the system prompt.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
impl GuardrailClassifier for LlmClassifier {
    async fn classify(&self, user_prompt: &str) -> GuardResult<GuardrailVerdict> {
        let completion = self
            .provider
            .invoke(Invocation::new(&self.prompt, user_prompt))
            .await
            .map_err(|err| GuardError::inconclusive(format!("classifier call failed: {err}")))?;

        let verdict = GuardrailVerdict::parse(completion.text())?;
        debug!(
            provider = self.provider.metadata().name(),
            %verdict,
            "guardrail classification"
        );
        Ok(verdict)
    }
}
