//! RemoveConversationHandler - deletes a conversation and everything it owns.

use std::sync::Arc;

use super::{load_owned, ConversationError};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::{ChatStore, MemoryStore};

#[derive(Debug, Clone)]
pub struct RemoveConversationCommand {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveConversationResult {
    pub removed_messages: usize,
}

/// Cascades to messages, their tool uses, queued index entries and
/// memories.
pub struct RemoveConversationHandler {
    store: Arc<dyn ChatStore>,
    memories: Arc<dyn MemoryStore>,
}

impl RemoveConversationHandler {
    pub fn new(store: Arc<dyn ChatStore>, memories: Arc<dyn MemoryStore>) -> Self {
        Self { store, memories }
    }

    pub async fn handle(
        &self,
        cmd: RemoveConversationCommand,
    ) -> Result<RemoveConversationResult, ConversationError> {
        // 1. Authorize
        load_owned(self.store.as_ref(), cmd.conversation_id, &cmd.user_id).await?;

        // 2. Cascade delete
        let removed = self.store.remove_conversation(cmd.conversation_id).await?;

        // 3. Drop memories of every message the delete actually removed
        for message_id in &removed {
            self.memories.remove_for_message(*message_id).await?;
        }
        tracing::info!(
            conversation_id = %cmd.conversation_id,
            removed_messages = removed.len(),
            "Conversation removed"
        );

        Ok(RemoveConversationResult {
            removed_messages: removed.len(),
        })
    }
}
