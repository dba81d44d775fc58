//! Provider-neutral tool descriptions, tool-call requests, and tool outcomes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

/// JSON-Schema-like description of a single tool parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    allowed: Option<Vec<Value>>,
}

impl ParameterSpec {
    /// Creates a parameter of the given JSON type (`string`, `number`, ...).
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: None,
            allowed: None,
        }
    }

    /// Shorthand for a `string` parameter.
    #[must_use]
    pub fn string() -> Self {
        Self::new("string")
    }

    /// Shorthand for a `number` parameter.
    #[must_use]
    pub fn number() -> Self {
        Self::new("number")
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restricts the parameter to an enumerated set of values.
    #[must_use]
    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the JSON type name.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the enumerated values, if any.
    #[must_use]
    pub fn allowed_values(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }
}

/// Description of a callable tool the model may request.
///
/// Built through [`ToolSpec::builder`]; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    name: String,
    description: String,
    parameters: BTreeMap<String, ParameterSpec>,
    required: Vec<String>,
}

impl ToolSpec {
    /// Starts building a tool specification.
    #[must_use]
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the parameters keyed by name.
    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, ParameterSpec> {
        &self.parameters
    }

    /// Returns the required parameter names in declaration order.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Renders the `properties` object shared by every backend schema.
    #[must_use]
    pub fn properties(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|(name, spec)| {
                let value = serde_json::to_value(spec).unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();
        Value::Object(properties)
    }

    /// Renders the `{type: object, properties, required}` input schema.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties(),
            "required": self.required,
        })
    }
}

/// Builder for [`ToolSpec`].
#[derive(Debug)]
pub struct ToolSpecBuilder {
    name: String,
    description: String,
    parameters: BTreeMap<String, ParameterSpec>,
    required: Vec<String>,
}

impl ToolSpecBuilder {
    /// Adds (or replaces) an optional parameter.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    /// Adds a parameter and marks it as required.
    #[must_use]
    pub fn required_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.parameters.insert(name, spec);
        self
    }

    /// Marks an already-declared parameter as required.
    #[must_use]
    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Finalises the specification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolSpec`] when the name is empty or a required
    /// parameter has not been declared.
    pub fn build(self) -> Result<ToolSpec> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidToolSpec {
                name: self.name,
                reason: "tool name cannot be empty".into(),
            });
        }

        if let Some(missing) = self
            .required
            .iter()
            .find(|name| !self.parameters.contains_key(*name))
        {
            return Err(Error::InvalidToolSpec {
                reason: format!("required parameter `{missing}` is not declared"),
                name: self.name,
            });
        }

        Ok(ToolSpec {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            required: self.required,
        })
    }
}

/// Checks that every tool in the list has a distinct name.
///
/// # Errors
///
/// Returns [`Error::DuplicateToolName`] for the first repeated name.
pub fn ensure_unique_names(specs: &[ToolSpec]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for spec in specs {
        if !seen.insert(spec.name()) {
            return Err(Error::DuplicateToolName {
                name: spec.name().to_owned(),
            });
        }
    }
    Ok(())
}

/// A backend's request, embedded in a model response, to run one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    id: String,
    name: String,
    input: Value,
}

impl ToolCall {
    /// Creates a tool call with the backend-assigned identifier.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Identifier assigned by the backend to this request.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the requested tool.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments supplied by the model.
    #[must_use]
    pub fn input(&self) -> &Value {
        &self.input
    }
}

/// Outcome of executing one [`ToolCall`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    tool_call_id: String,
    content: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolResult {
    /// Records a successful execution, rendering the output for display.
    #[must_use]
    pub fn success(tool_call_id: impl Into<String>, output: &Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: display_value(output),
            success: true,
            error: None,
        }
    }

    /// Records a failed execution. The model sees `Error: {message}`.
    #[must_use]
    pub fn failure(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            tool_call_id: tool_call_id.into(),
            content: format!("Error: {message}"),
            success: false,
            error: Some(message),
        }
    }

    /// Identifier of the originating tool call.
    #[must_use]
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    /// Text threaded back to the model.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the tool ran to completion.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Error message for failed executions.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
