//! Conversation command and query handlers.

mod create_conversation;
mod get_conversation;
mod list_conversations;
mod remove_conversation;
mod rename_conversation;

pub use create_conversation::{CreateConversationCommand, CreateConversationHandler};
pub use get_conversation::{GetConversationHandler, GetConversationQuery};
pub use list_conversations::{ListConversationsHandler, ListConversationsQuery};
pub use remove_conversation::{
    RemoveConversationCommand, RemoveConversationHandler, RemoveConversationResult,
};
pub use rename_conversation::{RenameConversationCommand, RenameConversationHandler};

use thiserror::Error;

use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, MessageId, UserId};
use crate::ports::{ChatStore, SchedulerError, StoreError};

/// Errors shared by the conversation and message handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Conversation {0} not found")]
    NotFound(ConversationId),

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Not authorized")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl From<DomainError> for ConversationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Forbidden | ErrorCode::Unauthorized => ConversationError::Forbidden,
            _ => ConversationError::Validation(err.message),
        }
    }
}

/// Loads a conversation and checks that `user` created it.
pub(crate) async fn load_owned(
    store: &dyn ChatStore,
    conversation_id: ConversationId,
    user: &UserId,
) -> Result<Conversation, ConversationError> {
    let conversation = store
        .get_conversation(conversation_id)
        .await?
        .ok_or(ConversationError::NotFound(conversation_id))?;
    conversation.ensure_owned_by(user)?;
    Ok(conversation)
}
