//! In-memory transport that replays canned responses.
//!
//! Useful for exercising providers without network access: every payload is
//! recorded so tests can assert on exactly what would have been sent.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{AdapterError, AdapterResult, ChatTransport};

/// Transport returning queued responses in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<AdapterResult<Value>>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedTransport {
    /// Creates a transport that answers with `responses` in order.
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a failure to be returned by the next unanswered request.
    pub fn push_error(&self, error: AdapterError) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
    }

    /// Returns every payload sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, payload: &Value) -> AdapterResult<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(AdapterError::response("no scripted response left")))
    }
}
