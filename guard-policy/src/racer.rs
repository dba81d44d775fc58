//! Concurrent guardrail and generation race.
//!
//! Both calls start together on the runtime. The racer waits for whichever
//! finishes first and never releases generated text before it has observed an
//! `allowed` verdict.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use guard_adapters::{AdapterResult, Completion};
use guard_primitives::format_token_usage;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::canary::CanaryFilter;
use crate::classifier::GuardrailClassifier;
use crate::error::{GuardError, GuardResult};
use crate::settings::GuardSettings;
use crate::verdict::GuardrailVerdict;

/// Why a turn was blocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// The classifier returned `not_allowed`.
    Guardrail,
    /// The response contained the canary word.
    CanaryLeak,
}

/// Terminal state of one guarded turn.
#[derive(Clone, Debug, PartialEq)]
pub enum RaceOutcome {
    /// Generation was allowed and passed the canary check.
    Delivered(Completion),
    /// The turn was blocked; `message` is the fixed reply.
    Blocked {
        /// Which check blocked the turn.
        reason: BlockReason,
        /// Fixed user-visible reply.
        message: String,
    },
}

impl RaceOutcome {
    /// Whether the turn was blocked.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Renders the single user-visible reply. Delivered text carries a
    /// trailing token-usage line; blocked replies do not.
    #[must_use]
    pub fn into_reply(self) -> String {
        match self {
            Self::Delivered(completion) => format!(
                "{}\n\n{}",
                completion.text(),
                format_token_usage(Some(completion.usage()))
            ),
            Self::Blocked { message, .. } => message,
        }
    }
}

/// Aborts the wrapped task when dropped, so an abandoned race never keeps
/// producing output.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum First {
    Guard(Result<GuardResult<GuardrailVerdict>, JoinError>),
    Generation(Result<AdapterResult<Completion>, JoinError>),
}

/// Runs a guardrail classifier against the main generation call.
#[derive(Clone)]
pub struct GuardrailRacer {
    classifier: Arc<dyn GuardrailClassifier>,
    canary: CanaryFilter,
    guardrail_message: String,
}

impl fmt::Debug for GuardrailRacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardrailRacer")
            .field("canary", &self.canary)
            .field("guardrail_message", &self.guardrail_message)
            .finish_non_exhaustive()
    }
}

impl GuardrailRacer {
    /// Creates a racer using the block messages and canary from `settings`.
    #[must_use]
    pub fn new(classifier: Arc<dyn GuardrailClassifier>, settings: &GuardSettings) -> Self {
        Self {
            classifier,
            canary: CanaryFilter::from_settings(settings),
            guardrail_message: settings.guardrail_message.clone(),
        }
    }

    /// Races classification of `user_prompt` against `generation`.
    ///
    /// A `not_allowed` verdict blocks the turn regardless of arrival order;
    /// when the verdict arrives first the generation task is aborted. A blank
    /// prompt is not classified; its generation is delivered directly.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Inconclusive`] if classification fails or the
    /// classifier task panics, [`GuardError::Generation`] if an allowed
    /// generation fails, and [`GuardError::TaskFailed`] if the generation
    /// task panics.
    pub async fn race<F>(&self, user_prompt: &str, generation: F) -> GuardResult<RaceOutcome>
    where
        F: Future<Output = AdapterResult<Completion>> + Send + 'static,
    {
        if user_prompt.trim().is_empty() {
            debug!("blank prompt; skipping guardrail");
            return Ok(self.deliver(generation.await?));
        }

        let classifier = Arc::clone(&self.classifier);
        let prompt = user_prompt.to_owned();
        let mut guard_task = AbortOnDrop(tokio::spawn(async move {
            classifier.classify(&prompt).await
        }));
        let mut generation_task = AbortOnDrop(tokio::spawn(generation));

        let first = tokio::select! {
            biased;
            guard = &mut guard_task.0 => First::Guard(guard),
            generated = &mut generation_task.0 => First::Generation(generated),
        };

        match first {
            First::Guard(guard) => {
                let verdict = flatten_guard(guard)?;
                debug!(%verdict, "guardrail finished first");
                if !verdict.is_allowed() {
                    generation_task.0.abort();
                    return Ok(self.blocked());
                }
                let generated = flatten_generation((&mut generation_task.0).await)?;
                Ok(self.deliver(generated))
            }
            First::Generation(generated) => {
                debug!("generation finished first; awaiting verdict");
                let verdict = flatten_guard((&mut guard_task.0).await)?;
                if !verdict.is_allowed() {
                    return Ok(self.blocked());
                }
                Ok(self.deliver(flatten_generation(generated)?))
            }
        }
    }

    fn blocked(&self) -> RaceOutcome {
        warn!(verdict = %GuardrailVerdict::NotAllowed, "guardrail triggered; discarding generation");
        RaceOutcome::Blocked {
            reason: BlockReason::Guardrail,
            message: self.guardrail_message.clone(),
        }
    }

    fn deliver(&self, completion: Completion) -> RaceOutcome {
        if let Some(message) = self.canary.blocked_reply(completion.text()) {
            return RaceOutcome::Blocked {
                reason: BlockReason::CanaryLeak,
                message: message.to_owned(),
            };
        }
        info!(
            provider = completion.usage().provider_name(),
            total_tokens = completion.usage().total_tokens(),
            "guarded response delivered"
        );
        RaceOutcome::Delivered(completion)
    }
}

fn flatten_guard(
    joined: Result<GuardResult<GuardrailVerdict>, JoinError>,
) -> GuardResult<GuardrailVerdict> {
    joined.map_err(|err| GuardError::inconclusive(format!("guardrail task failed: {err}")))?
}

fn flatten_generation(joined: Result<AdapterResult<Completion>, JoinError>) -> GuardResult<Completion> {
    let generated = joined.map_err(|err| GuardError::TaskFailed {
        reason: format!("generation task: {err}"),
    })?;
    Ok(generated?)
}
