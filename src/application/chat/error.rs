//! Error taxonomy for chat runs.

use thiserror::Error;

use crate::ports::{AIError, SchedulerError, StoreError, ToolExecutionError};

/// Unsupported or malformed streaming shapes. Always fatal to the turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("Content in tool call")]
    ContentInToolCall,

    #[error("Unexpected finish reason: {0}")]
    UnexpectedFinishReason(String),

    #[error("Missing tool call after starting tool call")]
    MissingToolCall,

    #[error("Multiple tool calls in a single message are not supported")]
    MultipleToolCalls,

    #[error("Tool call did not finish")]
    ToolCallDidNotFinish,

    #[error("Tool call did not provide a call ID")]
    MissingCallId,

    #[error("Tool call did not provide a function name")]
    MissingToolName,
}

/// Why a chat run stopped short.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("provider error: {0}")]
    Provider(#[from] AIError),

    #[error(transparent)]
    Tool(#[from] ToolExecutionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("title generation failed: {0}")]
    Title(String),
}

impl ChatError {
    /// Provider-level failures are answered with an apology instead of
    /// aborting the run.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, ChatError::Provider(err) if err.is_provider_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outage_is_provider_failure() {
        assert!(ChatError::from(AIError::unavailable("503")).is_provider_failure());
        assert!(ChatError::from(AIError::rate_limited(10)).is_provider_failure());
    }

    #[test]
    fn malformed_provider_payload_is_not_recovered() {
        assert!(!ChatError::from(AIError::parse("bad json")).is_provider_failure());
    }

    #[test]
    fn protocol_and_tool_errors_are_not_recovered() {
        assert!(!ChatError::from(ProtocolViolation::MultipleToolCalls).is_provider_failure());
        assert!(
            !ChatError::from(ToolExecutionError::UnknownTool("x".into())).is_provider_failure()
        );
    }

    #[test]
    fn protocol_messages_read_naturally() {
        let err = ChatError::from(ProtocolViolation::UnexpectedFinishReason("length".into()));
        assert_eq!(err.to_string(), "protocol violation: Unexpected finish reason: length");
    }
}
