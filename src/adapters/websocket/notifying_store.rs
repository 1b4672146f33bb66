//! ChatStore decorator that publishes every committed write.
//!
//! Wraps any store; each successful mutation is followed by exactly one
//! `ChatEvent` carrying the record as written. Failed writes publish
//! nothing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::conversation::{Conversation, Message, ToolUse};
use crate::domain::foundation::{ConversationId, MessageId, ToolUseId, UserId};
use crate::ports::{ChangeNotifier, ChatEvent, ChatStore, StoreError};

pub struct NotifyingChatStore {
    inner: Arc<dyn ChatStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl NotifyingChatStore {
    pub fn new(inner: Arc<dyn ChatStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { inner, notifier }
    }

    fn message_written(&self, message: Message) -> Message {
        self.notifier.publish(ChatEvent::MessageUpserted {
            message: message.clone(),
        });
        message
    }

    async fn tool_use_written(&self, tool_use: ToolUse) -> Result<ToolUse, StoreError> {
        let message = self
            .inner
            .get_message(tool_use.message_id())
            .await?
            .ok_or_else(|| StoreError::message_not_found(tool_use.message_id()))?;
        self.notifier.publish(ChatEvent::ToolUseUpserted {
            conversation_id: message.conversation_id(),
            tool_use: tool_use.clone(),
        });
        Ok(tool_use)
    }
}

#[async_trait]
impl ChatStore for NotifyingChatStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.inner.insert_conversation(conversation).await?;
        self.notifier.publish(ChatEvent::ConversationUpdated {
            conversation: conversation.clone(),
        });
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        self.inner.get_conversation(id).await
    }

    async fn list_conversations(&self, creator: &UserId) -> Result<Vec<Conversation>, StoreError> {
        self.inner.list_conversations(creator).await
    }

    async fn rename_conversation(
        &self,
        id: ConversationId,
        name: &str,
    ) -> Result<Conversation, StoreError> {
        let conversation = self.inner.rename_conversation(id, name).await?;
        self.notifier.publish(ChatEvent::ConversationUpdated {
            conversation: conversation.clone(),
        });
        Ok(conversation)
    }

    async fn apply_generated_title(
        &self,
        id: ConversationId,
        title: &str,
    ) -> Result<(Conversation, bool), StoreError> {
        let (conversation, applied) = self.inner.apply_generated_title(id, title).await?;
        if applied {
            self.notifier.publish(ChatEvent::ConversationUpdated {
                conversation: conversation.clone(),
            });
        }
        Ok((conversation, applied))
    }

    async fn remove_conversation(&self, id: ConversationId) -> Result<Vec<MessageId>, StoreError> {
        let removed = self.inner.remove_conversation(id).await?;
        self.notifier
            .publish(ChatEvent::ConversationRemoved { conversation_id: id });
        Ok(removed)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        self.inner.insert_message(message).await?;
        self.message_written(message.clone());
        Ok(())
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        self.inner.get_message(id).await
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        self.inner.list_messages(conversation_id).await
    }

    async fn patch_message_body(&self, id: MessageId, body: &str) -> Result<Message, StoreError> {
        let message = self.inner.patch_message_body(id, body).await?;
        Ok(self.message_written(message))
    }

    async fn complete_message(&self, id: MessageId) -> Result<Message, StoreError> {
        let message = self.inner.complete_message(id).await?;
        Ok(self.message_written(message))
    }

    async fn fail_message(&self, id: MessageId, error: &str) -> Result<Message, StoreError> {
        let message = self.inner.fail_message(id, error).await?;
        Ok(self.message_written(message))
    }

    async fn cancel_message(&self, id: MessageId) -> Result<Message, StoreError> {
        let message = self.inner.cancel_message(id).await?;
        Ok(self.message_written(message))
    }

    async fn start_tool_use(
        &self,
        message_id: MessageId,
        tool_name: &str,
    ) -> Result<ToolUse, StoreError> {
        let tool_use = self.inner.start_tool_use(message_id, tool_name).await?;
        self.tool_use_written(tool_use).await
    }

    async fn set_tool_arguments(&self, id: ToolUseId, args: &str) -> Result<ToolUse, StoreError> {
        let tool_use = self.inner.set_tool_arguments(id, args).await?;
        self.tool_use_written(tool_use).await
    }

    async fn set_tool_in_progress(&self, id: ToolUseId) -> Result<ToolUse, StoreError> {
        let tool_use = self.inner.set_tool_in_progress(id).await?;
        self.tool_use_written(tool_use).await
    }

    async fn set_tool_success(&self, id: ToolUseId, result: &str) -> Result<ToolUse, StoreError> {
        let tool_use = self.inner.set_tool_success(id, result).await?;
        self.tool_use_written(tool_use).await
    }

    async fn set_tool_error(&self, id: ToolUseId, error: &str) -> Result<ToolUse, StoreError> {
        let tool_use = self.inner.set_tool_error(id, error).await?;
        self.tool_use_written(tool_use).await
    }

    async fn list_tool_uses(&self, message_id: MessageId) -> Result<Vec<ToolUse>, StoreError> {
        self.inner.list_tool_uses(message_id).await
    }
}
