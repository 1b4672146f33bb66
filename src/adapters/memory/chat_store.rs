//! In-memory chat store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{read, write};
use crate::domain::conversation::{Conversation, LifecycleError, Message, ToolUse};
use crate::domain::foundation::{ConversationId, MessageId, ToolUseId, UserId};
use crate::ports::{ChatStore, StoreError};

#[derive(Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    /// Insertion order is creation order.
    messages: Vec<Message>,
    tool_uses: Vec<ToolUse>,
}

impl State {
    fn conversation_mut(&mut self, id: ConversationId) -> Result<&mut Conversation, StoreError> {
        self.conversations
            .get_mut(&id)
            .ok_or_else(|| StoreError::conversation_not_found(id))
    }

    fn message(&self, id: MessageId) -> Result<&Message, StoreError> {
        self.messages
            .iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| StoreError::message_not_found(id))
    }

    fn message_mut(&mut self, id: MessageId) -> Result<&mut Message, StoreError> {
        self.messages
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or_else(|| StoreError::message_not_found(id))
    }

    /// Applies `change` to a tool use whose parent message is generating.
    fn update_tool_use(
        &mut self,
        id: ToolUseId,
        change: impl FnOnce(&mut ToolUse) -> Result<(), LifecycleError>,
    ) -> Result<ToolUse, StoreError> {
        let message_id = self
            .tool_uses
            .iter()
            .find(|t| t.id() == id)
            .map(ToolUse::message_id)
            .ok_or_else(|| StoreError::tool_use_not_found(id))?;
        self.message(message_id)?.ensure_generating()?;

        let tool_use = self
            .tool_uses
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| StoreError::tool_use_not_found(id))?;
        change(tool_use)?;
        Ok(tool_use.clone())
    }

    fn update_message(
        &mut self,
        id: MessageId,
        change: impl FnOnce(&mut Message) -> Result<(), LifecycleError>,
    ) -> Result<Message, StoreError> {
        let message = self.message_mut(id)?;
        change(message)?;
        Ok(message.clone())
    }
}

/// Chat store held in process memory.
#[derive(Default)]
pub struct InMemoryChatStore {
    state: RwLock<State>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        write(&self.state)
            .conversations
            .insert(conversation.id(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(read(&self.state).conversations.get(&id).cloned())
    }

    async fn list_conversations(&self, creator: &UserId) -> Result<Vec<Conversation>, StoreError> {
        let state = read(&self.state);
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.is_owned_by(creator))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.created_at().cmp(a.created_at()));
        Ok(conversations)
    }

    async fn rename_conversation(
        &self,
        id: ConversationId,
        name: &str,
    ) -> Result<Conversation, StoreError> {
        let mut state = write(&self.state);
        let conversation = state.conversation_mut(id)?;
        conversation.rename(name)?;
        Ok(conversation.clone())
    }

    async fn apply_generated_title(
        &self,
        id: ConversationId,
        title: &str,
    ) -> Result<(Conversation, bool), StoreError> {
        let mut state = write(&self.state);
        let conversation = state.conversation_mut(id)?;
        let applied = conversation.apply_generated_title(title);
        Ok((conversation.clone(), applied))
    }

    async fn remove_conversation(&self, id: ConversationId) -> Result<Vec<MessageId>, StoreError> {
        let mut state = write(&self.state);
        state
            .conversations
            .remove(&id)
            .ok_or_else(|| StoreError::conversation_not_found(id))?;

        let removed: Vec<MessageId> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id() == id)
            .map(Message::id)
            .collect();
        state.messages.retain(|m| m.conversation_id() != id);
        state.tool_uses.retain(|t| !removed.contains(&t.message_id()));
        Ok(removed)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut state = write(&self.state);
        if !state.conversations.contains_key(&message.conversation_id()) {
            return Err(StoreError::conversation_not_found(message.conversation_id()));
        }
        state.messages.push(message.clone());
        Ok(())
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        Ok(read(&self.state)
            .messages
            .iter()
            .find(|m| m.id() == id)
            .cloned())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        Ok(read(&self.state)
            .messages
            .iter()
            .filter(|m| m.conversation_id() == conversation_id)
            .cloned()
            .collect())
    }

    async fn patch_message_body(&self, id: MessageId, body: &str) -> Result<Message, StoreError> {
        write(&self.state).update_message(id, |m| m.patch_body(body))
    }

    async fn complete_message(&self, id: MessageId) -> Result<Message, StoreError> {
        write(&self.state).update_message(id, Message::complete)
    }

    async fn fail_message(&self, id: MessageId, error: &str) -> Result<Message, StoreError> {
        write(&self.state).update_message(id, |m| m.fail(error))
    }

    async fn cancel_message(&self, id: MessageId) -> Result<Message, StoreError> {
        write(&self.state).update_message(id, Message::cancel)
    }

    async fn start_tool_use(
        &self,
        message_id: MessageId,
        tool_name: &str,
    ) -> Result<ToolUse, StoreError> {
        let mut state = write(&self.state);
        state.message(message_id)?.ensure_generating()?;
        let tool_use = ToolUse::start(message_id, tool_name);
        state.tool_uses.push(tool_use.clone());
        Ok(tool_use)
    }

    async fn set_tool_arguments(&self, id: ToolUseId, args: &str) -> Result<ToolUse, StoreError> {
        write(&self.state).update_tool_use(id, |t| t.set_arguments(args))
    }

    async fn set_tool_in_progress(&self, id: ToolUseId) -> Result<ToolUse, StoreError> {
        write(&self.state).update_tool_use(id, ToolUse::set_in_progress)
    }

    async fn set_tool_success(&self, id: ToolUseId, result: &str) -> Result<ToolUse, StoreError> {
        write(&self.state).update_tool_use(id, |t| t.set_success(result))
    }

    async fn set_tool_error(&self, id: ToolUseId, error: &str) -> Result<ToolUse, StoreError> {
        write(&self.state).update_tool_use(id, |t| t.set_error(error))
    }

    async fn list_tool_uses(&self, message_id: MessageId) -> Result<Vec<ToolUse>, StoreError> {
        Ok(read(&self.state)
            .tool_uses
            .iter()
            .filter(|t| t.message_id() == message_id)
            .cloned()
            .collect())
    }
}
