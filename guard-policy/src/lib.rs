//! Guardrails around LLM chat turns.
//!
//! A [`GuardrailRacer`] runs an instruction-override classifier concurrently
//! with the main generation call. A block verdict always wins, whichever call
//! finishes first; delivered text is then screened by the [`CanaryFilter`].

#![warn(missing_docs, clippy::pedantic)]

pub mod canary;
pub mod classifier;
pub mod error;
pub mod racer;
pub mod settings;
pub mod verdict;

pub use canary::CanaryFilter;
pub use classifier::{GuardrailClassifier, LlmClassifier};
pub use error::{GuardError, GuardResult};
pub use racer::{BlockReason, GuardrailRacer, RaceOutcome};
pub use settings::GuardSettings;
pub use verdict::GuardrailVerdict;
