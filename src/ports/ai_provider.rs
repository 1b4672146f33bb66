//! Chat Provider Port - Interface for the LLM chat-completion service.
//!
//! One streaming call per turn, plus a non-streaming structured call used
//! for title generation. The message and chunk shapes follow the
//! chat-completions wire model closely enough that adapters can serialize
//! them directly, while staying free of any HTTP details.
//!
//! # Example
//!
//! ```ignore
//! let request = ChatRequest::new(vec![
//!     ChatMessage::system("Be helpful"),
//!     ChatMessage::user("Hello"),
//! ])
//! .with_tools(registry.definitions());
//!
//! let mut chunks = provider.stream_chat(request).await?;
//! while let Some(chunk) = chunks.next().await {
//!     let chunk = chunk?;
//!     // ...
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

use crate::domain::conversation::ToolDefinition;

/// Stream of raw provider chunks for one turn.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, AIError>> + Send>>;

/// Port for LLM chat-completion interactions.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Issues one streaming chat completion and returns its raw chunks.
    ///
    /// Errors returned here (before the first chunk) and errors yielded by
    /// the stream are both provider-level failures.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream, AIError>;

    /// Issues one non-streaming completion constrained to a JSON schema and
    /// returns the parsed object.
    async fn complete_json(&self, request: JsonCompletionRequest) -> Result<serde_json::Value, AIError>;

    /// Provider name and configured model.
    fn provider_info(&self) -> ProviderInfo;
}

/// Request for a streamed chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Ordered context: system prompt first, then prior turns.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Request for a schema-constrained completion.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonCompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Name reported to the provider for the response format.
    pub schema_name: String,
    /// JSON Schema the reply must satisfy.
    pub schema: serde_json::Value,
}

/// A role-tagged context entry.
///
/// Serializes to the chat-completions message shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Assistant turn that records a single tool call.
    pub fn assistant_tool_call(call: ToolCall) -> Self {
        Self::Assistant {
            content: None,
            tool_calls: vec![call],
        }
    }

    /// Tool result fed back to the model.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }
}

/// A completed tool call as recorded in the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON argument text.
    pub arguments: String,
}

/// One streamed chunk (first choice only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatChunk {
    /// Content token(s), if any.
    pub content: Option<String>,
    /// Tool-call fragments; `None` when the chunk carries none.
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    /// Set on the chunk that ends generation.
    pub finish_reason: Option<FinishReason>,
}

impl ChatChunk {
    /// Chunk carrying content text.
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            content: Some(delta.into()),
            ..Self::default()
        }
    }

    /// Chunk carrying tool-call fragments.
    pub fn tool_calls(deltas: Vec<ToolCallDelta>) -> Self {
        Self {
            tool_calls: Some(deltas),
            ..Self::default()
        }
    }

    /// Chunk that only reports a finish reason.
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Self::default()
        }
    }

    /// True if the chunk contains non-empty content.
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Fragment of a streamed tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub index: u32,
    /// Provider-assigned call id, usually only on the first fragment.
    pub id: Option<String>,
    /// Function name, usually only on the first fragment.
    pub name: Option<String>,
    /// Next slice of argument text.
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// Opening fragment with id and name.
    pub fn start(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index: 0,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: None,
        }
    }

    /// Argument-only fragment.
    pub fn arguments(text: impl Into<String>) -> Self {
        Self {
            arguments: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Maps the provider's wire value.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(other) => other,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "openai").
    pub name: String,
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// AI provider errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AIError {
    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Context (prompt + history) exceeds model limit.
    #[error("context too long: {0}")]
    ContextTooLong(String),

    /// Content was filtered for safety.
    #[error("content filtered: {reason}")]
    ContentFiltered {
        /// Reason for filtering.
        reason: String,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider rejected the request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },
}

impl AIError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn content_filtered(reason: impl Into<String>) -> Self {
        Self::ContentFiltered {
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::Unavailable { .. }
                | AIError::Network(_)
                | AIError::Timeout { .. }
        )
    }

    /// Returns true for failures reported by the provider API or the
    /// transport to it. A chat run answers these with an apology instead
    /// of aborting. Malformed responses are not in this category.
    pub fn is_provider_failure(&self) -> bool {
        !matches!(self, AIError::Parse(_))
    }
}
