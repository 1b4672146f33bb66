//! CancelMessageHandler - stops an in-flight assistant reply.
//!
//! Cancellation only moves the message to its error state. A run that is
//! still streaming finds out on its next write, which the store rejects.

use std::sync::Arc;

use super::super::conversation::{load_owned, ConversationError};
use crate::domain::conversation::Message;
use crate::domain::foundation::{MessageId, UserId};
use crate::ports::ChatStore;

#[derive(Debug, Clone)]
pub struct CancelMessageCommand {
    pub message_id: MessageId,
    pub user_id: UserId,
}

pub struct CancelMessageHandler {
    store: Arc<dyn ChatStore>,
}

impl CancelMessageHandler {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CancelMessageCommand) -> Result<Message, ConversationError> {
        // 1. Load message
        let message = self
            .store
            .get_message(cmd.message_id)
            .await?
            .ok_or(ConversationError::MessageNotFound(cmd.message_id))?;

        // 2. Authorize through the owning conversation
        load_owned(self.store.as_ref(), message.conversation_id(), &cmd.user_id).await?;

        // 3. Fail it; the store rejects anything not generating
        let canceled = self.store.cancel_message(cmd.message_id).await?;
        tracing::info!(message_id = %cmd.message_id, "Message canceled by user");
        Ok(canceled)
    }
}
