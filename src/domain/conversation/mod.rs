//! Conversation module - conversations, messages and tool uses.
//!
//! These records are what a chat run persists into. Every write path goes
//! through the lifecycle checks defined here so that terminal states are
//! final and tool uses only move while their message is generating.

#[allow(clippy::module_inception)]
mod conversation;
mod message;
pub mod prompt;
mod tool_definition;
mod tool_use;

use thiserror::Error;

use crate::domain::foundation::{MessageId, ToolUseId};

pub use conversation::{clamp_title, Conversation, MAX_TITLE_WORDS};
pub use message::{
    Agent, Message, MessageState, MessageStatus, CANCELED_BY_USER, PLACEHOLDER_BODY,
};
pub use tool_definition::ToolDefinition;
pub use tool_use::{ToolUse, ToolUsePhase, ToolUseStatus};

/// A write was attempted against a record in the wrong lifecycle state.
///
/// These are consistency errors: they abort the caller rather than being
/// silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Message {0} is not generating")]
    MessageNotGenerating(MessageId),

    #[error("Message {0} is already complete")]
    MessageAlreadyComplete(MessageId),

    #[error("Message {0} is already in error state")]
    MessageAlreadyFailed(MessageId),

    #[error("Tool use {0} is not in generating state")]
    ToolUseNotGenerating(ToolUseId),

    #[error("Tool use {id} cannot move from {from:?} to {to:?}")]
    ToolUseTransition {
        id: ToolUseId,
        from: ToolUsePhase,
        to: ToolUsePhase,
    },
}
