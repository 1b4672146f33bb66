//! Tool registry and execution dispatcher.
//!
//! Tools are keyed by name and kept in registration order, which is also
//! the order their prompt fragments appear in the system prompt. The
//! dispatcher parses the model's raw argument text, runs the tool once and
//! serializes the result back to text for the model's context.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::conversation::prompt::build_system_prompt;
use crate::domain::conversation::ToolDefinition;
use crate::ports::{Tool, ToolExecutionContext, ToolExecutionError};

/// A tool with typed arguments and result.
///
/// Every `TypedTool` is a [`Tool`]: arguments are deserialized from the
/// parsed JSON (a mismatch is `InvalidArguments`) and the output is
/// serialized back to JSON.
#[async_trait]
pub trait TypedTool: Send + Sync {
    type Args: DeserializeOwned + Send;
    type Output: Serialize;

    fn describe(&self) -> ToolDefinition;

    async fn run(
        &self,
        context: &ToolExecutionContext,
        args: Self::Args,
    ) -> Result<Self::Output, ToolExecutionError>;
}

#[async_trait]
impl<T> Tool for T
where
    T: TypedTool,
{
    fn definition(&self) -> ToolDefinition {
        self.describe()
    }

    async fn call(
        &self,
        context: &ToolExecutionContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolExecutionError> {
        let args: T::Args = serde_json::from_value(args)
            .map_err(|e| ToolExecutionError::invalid_arguments(e.to_string()))?;
        let output = self.run(context, args).await?;
        serde_json::to_value(output).map_err(|e| ToolExecutionError::Serialization(e.to_string()))
    }
}

/// Registry of the tools offered to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.definition().name().to_string();
        match self.by_name.get(&name) {
            Some(&index) => self.tools[index] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.definitions()
            .into_iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Definitions in registration order, as offered to the provider.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Prompt fragments of the registered tools, separated by blank lines.
    pub fn tool_prompts(&self) -> String {
        self.definitions()
            .iter()
            .filter_map(|d| d.prompt().map(str::to_string))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Full system prompt for the currently registered tools.
    pub fn system_prompt(&self) -> String {
        build_system_prompt(&self.tool_prompts())
    }

    /// Parses `raw_args`, runs the named tool once and returns its result
    /// serialized as JSON text.
    ///
    /// # Errors
    ///
    /// - `UnknownTool` if nothing is registered under `name`
    /// - `InvalidArguments` if `raw_args` is not JSON or does not fit the
    ///   tool's argument shape
    /// - whatever the tool itself reports
    pub async fn execute_tool(
        &self,
        context: &ToolExecutionContext,
        name: &str,
        raw_args: &str,
    ) -> Result<String, ToolExecutionError> {
        let tool = self
            .by_name
            .get(name)
            .map(|&index| Arc::clone(&self.tools[index]))
            .ok_or_else(|| ToolExecutionError::UnknownTool(name.to_string()))?;

        let args: serde_json::Value = serde_json::from_str(raw_args)
            .map_err(|e| ToolExecutionError::invalid_arguments(e.to_string()))?;

        let result = tool.call(context, args).await?;
        serde_json::to_string(&result).map_err(|e| ToolExecutionError::Serialization(e.to_string()))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, MessageId, UserId};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    #[derive(Debug, Serialize)]
    struct AddOutput {
        sum: i64,
    }

    struct Add;

    #[async_trait]
    impl TypedTool for Add {
        type Args = AddArgs;
        type Output = AddOutput;

        fn describe(&self) -> ToolDefinition {
            ToolDefinition::new(
                "add",
                "Add two integers.",
                serde_json::json!({
                    "type": "object",
                    "required": ["a", "b"],
                    "properties": { "a": {"type": "integer"}, "b": {"type": "integer"} }
                }),
            )
            .with_prompt("Use \"add\" for arithmetic.")
        }

        async fn run(
            &self,
            _context: &ToolExecutionContext,
            args: AddArgs,
        ) -> Result<AddOutput, ToolExecutionError> {
            Ok(AddOutput { sum: args.a + args.b })
        }
    }

    struct Broken(&'static str);

    #[async_trait]
    impl Tool for Broken {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.0, "Always fails.", serde_json::json!({"type": "object"}))
        }

        async fn call(
            &self,
            _context: &ToolExecutionContext,
            _args: serde_json::Value,
        ) -> Result<serde_json::Value, ToolExecutionError> {
            Err(ToolExecutionError::execution_failed("back-end down"))
        }
    }

    fn context() -> ToolExecutionContext {
        ToolExecutionContext::new(
            MessageId::new(),
            ConversationId::new(),
            UserId::new("user_1").unwrap(),
            "call_1",
        )
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(Add))
            .with(Arc::new(Broken("broken")))
    }

    #[tokio::test]
    async fn executes_and_serializes_result() {
        let result = registry()
            .execute_tool(&context(), "add", r#"{"a": 2, "b": 3}"#)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed, serde_json::json!({"sum": 5}));
    }

    #[tokio::test]
    async fn unknown_tool_fails() {
        let err = registry()
            .execute_tool(&context(), "teleport", "{}")
            .await
            .unwrap_err();
        assert_eq!(err, ToolExecutionError::UnknownTool("teleport".into()));
    }

    #[tokio::test]
    async fn malformed_json_fails_before_running() {
        let err = registry()
            .execute_tool(&context(), "add", r#"{"a": 2,"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolExecutionError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn schema_mismatch_fails() {
        let err = registry()
            .execute_tool(&context(), "add", r#"{"a": "two", "b": 3}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolExecutionError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn tool_failures_propagate() {
        let err = registry()
            .execute_tool(&context(), "broken", "{}")
            .await
            .unwrap_err();
        assert_eq!(err, ToolExecutionError::execution_failed("back-end down"));
    }

    #[test]
    fn prompts_only_include_tools_that_have_one() {
        let reg = registry().with(Arc::new(Broken("other")));
        assert_eq!(reg.tool_prompts(), "Use \"add\" for arithmetic.");
        assert!(reg.system_prompt().contains("Use \"add\" for arithmetic."));
    }

    #[test]
    fn definitions_keep_registration_order_and_replace_in_place() {
        let mut reg = registry();
        reg.register(Arc::new(Broken("add")));
        assert_eq!(reg.names(), vec!["add", "broken"]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.definitions()[0].description(), "Always fails.");
    }
}
