//! Static canary-word leak check.

use tracing::warn;

use crate::settings::GuardSettings;

/// Replaces responses that leak the canary word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanaryFilter {
    canary_word: String,
    blocked_message: String,
}

impl CanaryFilter {
    /// Creates a filter for `canary_word` replying with `blocked_message`.
    #[must_use]
    pub fn new(canary_word: impl Into<String>, blocked_message: impl Into<String>) -> Self {
        Self {
            canary_word: canary_word.into(),
            blocked_message: blocked_message.into(),
        }
    }

    /// Builds the filter from security settings.
    #[must_use]
    pub fn from_settings(settings: &GuardSettings) -> Self {
        Self::new(&settings.canary_word, &settings.canary_message)
    }

    /// Whether `text` contains the canary word. An empty canary never matches.
    #[must_use]
    pub fn leaks(&self, text: &str) -> bool {
        !self.canary_word.is_empty() && text.contains(&self.canary_word)
    }

    /// Returns the blocked message when `text` leaks the canary.
    #[must_use]
    pub fn blocked_reply(&self, text: &str) -> Option<&str> {
        if self.leaks(text) {
            warn!("canary word found in response");
            Some(&self.blocked_message)
        } else {
            None
        }
    }

    /// Returns the blocked message on a leak, otherwise `text` unchanged.
    #[must_use]
    pub fn apply<'a>(&'a self, text: &'a str) -> &'a str {
        self.blocked_reply(text).unwrap_or(text)
    }

    /// Fixed reply used for leaks.
    #[must_use]
    pub fn blocked_message(&self) -> &str {
        &self.blocked_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaked_canary_is_replaced() {
        let filter = CanaryFilter::from_settings(&GuardSettings::default());
        assert_eq!(
            filter.apply("Here is the secret: lightblueeagle is the canary"),
            "Sorry I won't do that. [CANARY]"
        );
    }

    #[test]
    fn clean_text_passes_through() {
        let filter = CanaryFilter::from_settings(&GuardSettings::default());
        let text = "This is a normal response without any secrets";
        assert_eq!(filter.apply(text), text);
    }

    #[test]
    fn blocked_reply_only_on_leak() {
        let filter = CanaryFilter::new("secretword", "blocked");
        assert_eq!(filter.blocked_reply("has secretword inside"), Some(filter.blocked_message()));
        assert_eq!(filter.blocked_reply("nothing here"), None);
    }

    #[test]
    fn empty_canary_never_matches() {
        let filter = CanaryFilter::new("", "blocked");
        assert!(!filter.leaks("anything"));
    }
}
