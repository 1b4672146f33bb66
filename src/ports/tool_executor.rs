//! Tool Port - Interface for tools the model can invoke during a chat run.
//!
//! A tool receives already-parsed JSON arguments plus the call context and
//! returns a JSON result. Looking tools up by name, parsing the raw
//! argument text and serializing the result back to text is the job of
//! the registry in `application::tools`.
//!
//! # Example
//!
//! ```ignore
//! struct Echo;
//!
//! #[async_trait]
//! impl Tool for Echo {
//!     fn definition(&self) -> ToolDefinition {
//!         ToolDefinition::new("echo", "Echo the arguments", json!({"type": "object"}))
//!     }
//!
//!     async fn call(&self, _ctx: &ToolExecutionContext, args: Value) -> Result<Value, ToolExecutionError> {
//!         Ok(args)
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversation::ToolDefinition;
use crate::domain::foundation::{ConversationId, MessageId, UserId};

/// A named, schema-described capability exposed to the model.
///
/// Implementations must be object safe; the registry stores them as
/// `Arc<dyn Tool>`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description, schemas and optional prompt fragment.
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool once. No retries happen at this level.
    async fn call(
        &self,
        context: &ToolExecutionContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolExecutionError>;
}

/// Who and what a tool call belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExecutionContext {
    /// Assistant message the call is attached to.
    pub message_id: MessageId,

    /// Conversation being answered.
    pub conversation_id: ConversationId,

    /// Conversation creator; tools must not read other users' data.
    pub user_id: UserId,

    /// Provider-assigned call id.
    pub call_id: String,
}

impl ToolExecutionContext {
    pub fn new(
        message_id: MessageId,
        conversation_id: ConversationId,
        user_id: UserId,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            conversation_id,
            user_id,
            call_id: call_id.into(),
        }
    }
}

/// Errors that can occur while dispatching or running a tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolExecutionError {
    /// No tool is registered under the name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Argument text is not JSON or does not match the tool's schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool or its back-end failed.
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    /// The result could not be serialized.
    #[error("Failed to serialize tool result: {0}")]
    Serialization(String),
}

impl ToolExecutionError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }
}
