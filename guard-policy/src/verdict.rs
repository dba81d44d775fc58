//! Guardrail verdicts and classifier-output parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, GuardResult};

/// Outcome of an instruction-override classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailVerdict {
    /// The user message may proceed.
    Allowed,
    /// The user message tries to change or ignore instructions.
    NotAllowed,
}

impl GuardrailVerdict {
    /// Parses raw classifier text.
    ///
    /// The text is trimmed, lower-cased, and stripped of surrounding quotes
    /// and punctuation. Any mention of `not_allowed` (or `not allowed`) blocks.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Inconclusive`] when neither label is present.
    pub fn parse(raw: &str) -> GuardResult<Self> {
        let normalized = raw
            .trim()
            .trim_matches(|c: char| (c.is_ascii_punctuation() && c != '_') || c.is_whitespace())
            .to_lowercase();

        if normalized.contains("not_allowed") || normalized.contains("not allowed") {
            Ok(Self::NotAllowed)
        } else if normalized.contains("allowed") {
            Ok(Self::Allowed)
        } else {
            Err(GuardError::inconclusive(format!(
                "unrecognised classifier output: {raw:?}"
            )))
        }
    }

    /// Whether the turn may proceed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Wire label (`allowed` / `not_allowed`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::NotAllowed => "not_allowed",
        }
    }
}

impl fmt::Display for GuardrailVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
