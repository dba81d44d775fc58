//! Caller-side chat bots.
//!
//! Bots own no conversation state and no globals: each is built from an
//! explicit provider handle and settings supplied by the caller.

#![warn(missing_docs, clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod secure;
pub mod tools;
pub mod unprotected;

pub use catalog::ProviderCatalog;
pub use error::{BotError, BotResult};
pub use secure::SecureBot;
pub use tools::ToolBot;
pub use unprotected::{UnprotectedBot, format_response};
