//! CreateConversationHandler - starts a new conversation.

use std::sync::Arc;

use super::ConversationError;
use crate::domain::conversation::Conversation;
use crate::domain::foundation::UserId;
use crate::ports::ChatStore;

/// Command to create a conversation, optionally already named.
#[derive(Debug, Clone)]
pub struct CreateConversationCommand {
    pub user_id: UserId,
    pub name: Option<String>,
}

pub struct CreateConversationHandler {
    store: Arc<dyn ChatStore>,
}

impl CreateConversationHandler {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: CreateConversationCommand,
    ) -> Result<Conversation, ConversationError> {
        let conversation = Conversation::new(cmd.user_id, cmd.name);
        self.store.insert_conversation(&conversation).await?;
        tracing::info!(conversation_id = %conversation.id(), "Conversation created");
        Ok(conversation)
    }
}
