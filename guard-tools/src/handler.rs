//! Name-keyed tool registry with last-write-wins registration.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use guard_primitives::{ToolCall, ToolResult};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Result alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Trait implemented by executable tools.
pub trait ToolFunction: Send + Sync {
    /// Runs the tool with the model-supplied arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Execution`] when the tool cannot complete.
    fn call(&self, input: &Value) -> Result<Value>;
}

impl<F> ToolFunction for F
where
    F: Fn(&Value) -> Result<Value> + Send + Sync,
{
    fn call(&self, input: &Value) -> Result<Value> {
        (self)(input)
    }
}

/// Registry mapping tool names to executable functions.
#[derive(Default)]
pub struct ToolHandler {
    tools: RwLock<HashMap<String, Arc<dyn ToolFunction>>>,
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort();
        f.debug_struct("ToolHandler")
            .field("registered", &names)
            .finish()
    }
}

impl ToolHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any previous registration under `name`.
    pub fn register<T>(&self, name: impl Into<String>, tool: T)
    where
        T: ToolFunction + 'static,
    {
        let name = name.into();
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        if tools.insert(name.clone(), Arc::new(tool)).is_some() {
            debug!(tool = %name, "replaced existing tool registration");
        }
    }

    /// Returns `true` when a tool is registered under `name`.
    #[must_use]
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Returns the registered tool names in arbitrary order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Executes the named tool synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when nothing is registered under
    /// `name`, or whatever error the tool itself returns.
    pub fn execute(&self, name: &str, input: &Value) -> Result<Value> {
        let tool = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_owned(),
            })?;
        tool.call(input)
    }

    /// Executes one model-requested call and folds the outcome into a
    /// [`ToolResult`]. Never fails: errors and panics become failed results.
    #[must_use]
    pub fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute(call.name(), call.input())))
            .unwrap_or_else(|payload| Err(ToolError::execution(panic_message(&*payload))));

        match outcome {
            Ok(output) => {
                debug!(tool = call.name(), tool_call_id = call.id(), "tool call succeeded");
                ToolResult::success(call.id(), &output)
            }
            Err(err) => {
                warn!(
                    tool = call.name(),
                    tool_call_id = call.id(),
                    error = %err,
                    "tool call failed"
                );
                ToolResult::failure(call.id(), err.to_string())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_owned()
    }
}

/// Errors produced while executing tools.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Requested tool does not exist.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }
}
