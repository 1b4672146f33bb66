//! Message entity and its lifecycle.
//!
//! User messages are inserted already `complete` and never change. The
//! assistant reply starts as a `generating` placeholder that only the chat
//! orchestrator mutates; it transitions exactly once to `complete` or
//! `error`, after which every further write is rejected.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConversationId, DomainError, MessageId, StateMachine, Timestamp, UserId,
};

use super::LifecycleError;

/// Body written into a fresh assistant placeholder.
pub const PLACEHOLDER_BODY: &str = "...";

/// Failure reason recorded when the author cancels a reply.
pub const CANCELED_BY_USER: &str = "Canceled by user";

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Agent {
    /// Written by a signed-in user.
    User { id: UserId },
    /// Produced by the model.
    Assistant,
}

impl Agent {
    pub fn is_assistant(&self) -> bool {
        matches!(self, Agent::Assistant)
    }
}

/// Lifecycle kind of a message, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Generating,
    Complete,
    Error,
}

impl StateMachine for MessageStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (MessageStatus::Generating, MessageStatus::Complete)
                | (MessageStatus::Generating, MessageStatus::Error)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            MessageStatus::Generating => vec![MessageStatus::Complete, MessageStatus::Error],
            MessageStatus::Complete | MessageStatus::Error => vec![],
        }
    }
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Generating => "generating",
            MessageStatus::Complete => "complete",
            MessageStatus::Error => "error",
        }
    }
}

/// Lifecycle state of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageState {
    Generating,
    Complete,
    Error { error: String },
}

impl MessageState {
    pub fn status(&self) -> MessageStatus {
        match self {
            MessageState::Generating => MessageStatus::Generating,
            MessageState::Complete => MessageStatus::Complete,
            MessageState::Error { .. } => MessageStatus::Error,
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, MessageState::Generating)
    }

    /// Failure reason, when in the error state.
    pub fn error(&self) -> Option<&str> {
        match self {
            MessageState::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// A single entry in a conversation.
///
/// # Invariants
///
/// - `conversation_id` and `agent` never change after creation
/// - once `state` is terminal, `body` and `state` are frozen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_id: ConversationId,
    agent: Agent,
    body: String,
    state: MessageState,
    created_at: Timestamp,
}

impl Message {
    /// Creates a completed user message.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the body is blank
    pub fn user(
        conversation_id: ConversationId,
        author: UserId,
        body: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation("body", "Message body cannot be empty"));
        }
        Ok(Self {
            id: MessageId::new(),
            conversation_id,
            agent: Agent::User { id: author },
            body,
            state: MessageState::Complete,
            created_at: Timestamp::now(),
        })
    }

    /// Creates the assistant placeholder that a chat run fills in.
    pub fn assistant_placeholder(conversation_id: ConversationId) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            agent: Agent::Assistant,
            body: PLACEHOLDER_BODY.to_string(),
            state: MessageState::Generating,
            created_at: Timestamp::now(),
        }
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        conversation_id: ConversationId,
        agent: Agent,
        body: String,
        state: MessageState,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            agent,
            body,
            state,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn state(&self) -> &MessageState {
        &self.state
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn is_generating(&self) -> bool {
        self.state.is_generating()
    }

    pub fn is_complete(&self) -> bool {
        self.state == MessageState::Complete
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Fails unless the message is still generating.
    pub fn ensure_generating(&self) -> Result<(), LifecycleError> {
        if self.is_generating() {
            Ok(())
        } else {
            Err(LifecycleError::MessageNotGenerating(self.id))
        }
    }

    /// Replaces the body with a newer streaming snapshot.
    pub fn patch_body(&mut self, body: impl Into<String>) -> Result<(), LifecycleError> {
        self.ensure_generating()?;
        self.body = body.into();
        Ok(())
    }

    /// Marks the reply as finished.
    pub fn complete(&mut self) -> Result<(), LifecycleError> {
        self.state
            .status()
            .transition_to(MessageStatus::Complete)
            .map_err(|_| LifecycleError::MessageNotGenerating(self.id))?;
        self.state = MessageState::Complete;
        Ok(())
    }

    /// Moves the message to the error state with a reason.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), LifecycleError> {
        match self.state.status() {
            MessageStatus::Complete => Err(LifecycleError::MessageAlreadyComplete(self.id)),
            MessageStatus::Error => Err(LifecycleError::MessageAlreadyFailed(self.id)),
            MessageStatus::Generating => {
                self.state = MessageState::Error {
                    error: error.into(),
                };
                Ok(())
            }
        }
    }

    /// Cooperative cancellation: fails a generating reply with the
    /// cancellation reason. The running orchestrator notices on its next
    /// write.
    pub fn cancel(&mut self) -> Result<(), LifecycleError> {
        self.ensure_generating()?;
        self.fail(CANCELED_BY_USER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_id() -> UserId {
        UserId::new("user_1").unwrap()
    }

    mod creation {
        use super::*;

        #[test]
        fn user_message_is_complete_immediately() {
            let msg = Message::user(ConversationId::new(), user_id(), "hi").unwrap();
            assert!(msg.is_complete());
            assert_eq!(msg.agent(), &Agent::User { id: user_id() });
        }

        #[test]
        fn blank_user_message_is_rejected() {
            assert!(Message::user(ConversationId::new(), user_id(), "  \n").is_err());
        }

        #[test]
        fn placeholder_is_generating_with_ellipsis() {
            let msg = Message::assistant_placeholder(ConversationId::new());
            assert!(msg.is_generating());
            assert_eq!(msg.body(), PLACEHOLDER_BODY);
            assert!(msg.agent().is_assistant());
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn patch_then_complete() {
            let mut msg = Message::assistant_placeholder(ConversationId::new());
            msg.patch_body("Hel").unwrap();
            msg.patch_body("Hello").unwrap();
            msg.complete().unwrap();
            assert_eq!(msg.body(), "Hello");
            assert!(msg.is_complete());
        }

        #[test]
        fn patching_complete_message_fails() {
            let mut msg = Message::assistant_placeholder(ConversationId::new());
            msg.complete().unwrap();
            assert_eq!(
                msg.patch_body("late"),
                Err(LifecycleError::MessageNotGenerating(msg.id()))
            );
        }

        #[test]
        fn completing_twice_fails() {
            let mut msg = Message::assistant_placeholder(ConversationId::new());
            msg.complete().unwrap();
            assert!(msg.complete().is_err());
        }

        #[test]
        fn fail_reports_which_terminal_state() {
            let mut done = Message::assistant_placeholder(ConversationId::new());
            done.complete().unwrap();
            assert_eq!(
                done.fail("x"),
                Err(LifecycleError::MessageAlreadyComplete(done.id()))
            );

            let mut failed = Message::assistant_placeholder(ConversationId::new());
            failed.fail("boom").unwrap();
            assert_eq!(failed.state().error(), Some("boom"));
            assert_eq!(
                failed.fail("again"),
                Err(LifecycleError::MessageAlreadyFailed(failed.id()))
            );
        }

        #[test]
        fn cancel_sets_reason_and_blocks_writes() {
            let mut msg = Message::assistant_placeholder(ConversationId::new());
            msg.cancel().unwrap();
            assert_eq!(msg.state().error(), Some(CANCELED_BY_USER));
            assert!(msg.patch_body("more").is_err());
            assert!(msg.complete().is_err());
        }

        #[test]
        fn cancel_on_user_message_fails() {
            let mut msg = Message::user(ConversationId::new(), user_id(), "hi").unwrap();
            assert!(msg.cancel().is_err());
        }
    }

    mod status {
        use super::*;

        #[test]
        fn only_generating_has_exits() {
            assert!(!MessageStatus::Generating.is_terminal());
            assert!(MessageStatus::Complete.is_terminal());
            assert!(MessageStatus::Error.is_terminal());
        }

        #[test]
        fn state_serializes_with_type_tag() {
            let json = serde_json::to_value(MessageState::Error {
                error: "nope".into(),
            })
            .unwrap();
            assert_eq!(json, serde_json::json!({"type": "error", "error": "nope"}));
        }
    }
}
