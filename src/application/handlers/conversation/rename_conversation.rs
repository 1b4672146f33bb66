//! RenameConversationHandler - explicit rename by the creator.

use std::sync::Arc;

use super::{load_owned, ConversationError};
use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::ChatStore;

#[derive(Debug, Clone)]
pub struct RenameConversationCommand {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub name: String,
}

pub struct RenameConversationHandler {
    store: Arc<dyn ChatStore>,
}

impl RenameConversationHandler {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Renames unconditionally; unlike auto-titling this overwrites an
    /// existing name.
    pub async fn handle(
        &self,
        cmd: RenameConversationCommand,
    ) -> Result<Conversation, ConversationError> {
        // 1. Authorize
        let mut conversation =
            load_owned(self.store.as_ref(), cmd.conversation_id, &cmd.user_id).await?;

        // 2. Validate before touching the store
        conversation.rename(&cmd.name)?;

        // 3. Persist
        Ok(self
            .store
            .rename_conversation(cmd.conversation_id, conversation.name().unwrap_or_default())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryChatStore;

    async fn setup() -> (Arc<InMemoryChatStore>, Conversation) {
        let store = Arc::new(InMemoryChatStore::new());
        let conversation =
            Conversation::new(UserId::new("alice").unwrap(), Some("Auto title".into()));
        store.insert_conversation(&conversation).await.unwrap();
        (store, conversation)
    }

    #[tokio::test]
    async fn rename_overwrites_existing_name() {
        let (store, conversation) = setup().await;
        let renamed = RenameConversationHandler::new(store)
            .handle(RenameConversationCommand {
                conversation_id: conversation.id(),
                user_id: UserId::new("alice").unwrap(),
                name: "  Trip planning ".into(),
            })
            .await
            .unwrap();
        assert_eq!(renamed.name(), Some("Trip planning"));
    }

    #[tokio::test]
    async fn blank_rename_is_rejected() {
        let (store, conversation) = setup().await;
        let err = RenameConversationHandler::new(store)
            .handle(RenameConversationCommand {
                conversation_id: conversation.id(),
                user_id: UserId::new("alice").unwrap(),
                name: " ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConversationError::Validation(_)));
    }

    #[tokio::test]
    async fn non_creator_cannot_rename() {
        let (store, conversation) = setup().await;
        let err = RenameConversationHandler::new(store)
            .handle(RenameConversationCommand {
                conversation_id: conversation.id(),
                user_id: UserId::new("bob").unwrap(),
                name: "Mine now".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ConversationError::Forbidden);
    }
}
