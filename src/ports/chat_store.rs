//! Chat store port - persistence for conversations, messages and tool uses.
//!
//! Every mutating operation is a single check-then-write unit: the store
//! reads the current record (and, for tool uses, the owning message),
//! validates the lifecycle rule, and writes, all inside one transaction.
//! That is what keeps a single chat run the only writer of its message
//! without any locking at the application level; a cancelled or finished
//! message simply rejects the next write.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::conversation::{Conversation, LifecycleError, Message, ToolUse};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, ToolUseId, UserId,
};

/// Store port for the chat records.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // ─── Conversations ───

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError>;

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Conversations created by `creator`, newest first.
    async fn list_conversations(&self, creator: &UserId) -> Result<Vec<Conversation>, StoreError>;

    /// Explicit rename; always overwrites.
    async fn rename_conversation(
        &self,
        id: ConversationId,
        name: &str,
    ) -> Result<Conversation, StoreError>;

    /// Sets a generated title only if the conversation is still unnamed.
    ///
    /// Returns the conversation and whether the title was applied.
    async fn apply_generated_title(
        &self,
        id: ConversationId,
        title: &str,
    ) -> Result<(Conversation, bool), StoreError>;

    /// Deletes the conversation with its messages and their tool uses.
    ///
    /// Returns the ids of the removed messages.
    async fn remove_conversation(&self, id: ConversationId) -> Result<Vec<MessageId>, StoreError>;

    // ─── Messages ───

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError>;

    /// Messages of a conversation in creation order.
    async fn list_messages(&self, conversation_id: ConversationId)
        -> Result<Vec<Message>, StoreError>;

    /// Replaces the body. Requires the message to be generating.
    async fn patch_message_body(&self, id: MessageId, body: &str) -> Result<Message, StoreError>;

    /// Requires the message to be generating.
    async fn complete_message(&self, id: MessageId) -> Result<Message, StoreError>;

    /// Rejects messages that are already complete or already failed.
    async fn fail_message(&self, id: MessageId, error: &str) -> Result<Message, StoreError>;

    /// Fails a generating message with the cancellation reason.
    async fn cancel_message(&self, id: MessageId) -> Result<Message, StoreError>;

    // ─── Tool uses ───

    /// Creates a tool use under a message that must still be generating.
    async fn start_tool_use(
        &self,
        message_id: MessageId,
        tool_name: &str,
    ) -> Result<ToolUse, StoreError>;

    async fn set_tool_arguments(&self, id: ToolUseId, args: &str) -> Result<ToolUse, StoreError>;

    async fn set_tool_in_progress(&self, id: ToolUseId) -> Result<ToolUse, StoreError>;

    async fn set_tool_success(&self, id: ToolUseId, result: &str) -> Result<ToolUse, StoreError>;

    async fn set_tool_error(&self, id: ToolUseId, error: &str) -> Result<ToolUse, StoreError>;

    /// Tool uses of a message in creation order.
    async fn list_tool_uses(&self, message_id: MessageId) -> Result<Vec<ToolUse>, StoreError>;
}

/// Errors from the store ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A lifecycle rule rejected the write.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn conversation_not_found(id: ConversationId) -> Self {
        Self::NotFound {
            entity: "Conversation",
            id: id.to_string(),
        }
    }

    pub fn message_not_found(id: MessageId) -> Self {
        Self::NotFound {
            entity: "Message",
            id: id.to_string(),
        }
    }

    pub fn tool_use_not_found(id: ToolUseId) -> Self {
        Self::NotFound {
            entity: "Tool use",
            id: id.to_string(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        StoreError::Invalid(err.message)
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::NotFound { entity, .. } => match *entity {
                "Conversation" => ErrorCode::ConversationNotFound,
                "Message" => ErrorCode::MessageNotFound,
                "Tool use" => ErrorCode::ToolUseNotFound,
                _ => ErrorCode::UserNotFound,
            },
            StoreError::Lifecycle(_) => ErrorCode::InvalidStateTransition,
            StoreError::Invalid(_) => ErrorCode::ValidationFailed,
            StoreError::Database(_) => ErrorCode::DatabaseError,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let id = MessageId::new();
        let err = StoreError::message_not_found(id);
        assert_eq!(err.to_string(), format!("Message {} not found", id));
        assert!(err.is_not_found());
    }

    #[test]
    fn lifecycle_errors_keep_their_message() {
        let id = MessageId::new();
        let err: StoreError = LifecycleError::MessageNotGenerating(id).into();
        assert_eq!(err.to_string(), format!("Message {} is not generating", id));
    }

    #[test]
    fn domain_error_codes_follow_variant() {
        let err: DomainError = StoreError::conversation_not_found(ConversationId::new()).into();
        assert_eq!(err.code, ErrorCode::ConversationNotFound);
        let err: DomainError =
            StoreError::from(LifecycleError::MessageAlreadyComplete(MessageId::new())).into();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn chat_store_is_object_safe() {
        fn _accepts_dyn(_: &dyn ChatStore) {}
    }
}
