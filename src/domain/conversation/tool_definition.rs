//! Tool definition - schema and metadata for a tool the model can call.

use serde::{Deserialize, Serialize};

/// Definition of a tool that the model can invoke.
///
/// Carries what the provider needs (name, description, parameter schema),
/// the declared result shape, and an optional prompt fragment that is
/// spliced into the system prompt while the tool is registered.
///
/// ```ignore
/// let definition = ToolDefinition::new(
///     "queryMemory",
///     "Issue a semantic search query over all previous memories.",
///     serde_json::json!({
///         "type": "object",
///         "required": ["query"],
///         "properties": { "query": { "type": "string" } }
///     }),
/// )
/// .with_prompt("Use the \"queryMemory\" tool to search for memories.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "queryMemory")
    name: String,

    /// Description shown to the model
    description: String,

    /// JSON Schema for the arguments
    parameters_schema: serde_json::Value,

    /// JSON Schema for the serialized result
    returns_schema: serde_json::Value,

    /// Fragment appended to the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
}

impl ToolDefinition {
    /// Creates a definition whose result shape is unconstrained.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
            returns_schema: serde_json::json!({}),
            prompt: None,
        }
    }

    pub fn with_returns(mut self, returns_schema: serde_json::Value) -> Self {
        self.returns_schema = returns_schema;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters_schema(&self) -> &serde_json::Value {
        &self.parameters_schema
    }

    pub fn returns_schema(&self) -> &serde_json::Value {
        &self.returns_schema
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Converts to the chat-completions `tools` entry.
    pub fn to_openai_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ToolDefinition {
        ToolDefinition::new(
            "readFile",
            "Read a file from a sandbox.",
            serde_json::json!({
                "type": "object",
                "required": ["sandbox_id", "path"],
                "properties": {
                    "sandbox_id": { "type": "string" },
                    "path": { "type": "string" }
                }
            }),
        )
    }

    #[test]
    fn openai_format_has_function_wrapper() {
        let json = sample().to_openai_format();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "readFile");
        assert_eq!(json["function"]["description"], "Read a file from a sandbox.");
        assert_eq!(json["function"]["parameters"]["required"][1], "path");
    }

    #[test]
    fn prompt_is_optional() {
        assert_eq!(sample().prompt(), None);
        assert_eq!(sample().with_prompt("hint").prompt(), Some("hint"));
    }

    #[test]
    fn prompt_is_not_serialized_when_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("prompt").is_none());
    }
}
