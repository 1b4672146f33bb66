//! Shared state for the chat API.

use std::sync::Arc;

use crate::adapters::clerk::WebhookVerifier;
use crate::application::handlers::{
    CancelMessageHandler, CreateConversationHandler, GetConversationHandler,
    ListConversationsHandler, ListMessagesHandler, RemoveConversationHandler,
    RenameConversationHandler, SendMessageHandler, SyncUserHandler, UserAccessHandler,
};
use crate::ports::{ChatStore, MemoryStore, SessionValidator, TaskScheduler, UserRepository};

/// Ports behind the API. Handlers are built per request from these.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub memories: Arc<dyn MemoryStore>,
    pub users: Arc<dyn UserRepository>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub sessions: Arc<dyn SessionValidator>,
    pub access: Arc<UserAccessHandler>,
    pub webhook: Arc<WebhookVerifier>,
}

impl AppState {
    pub fn create_conversation_handler(&self) -> CreateConversationHandler {
        CreateConversationHandler::new(self.store.clone())
    }

    pub fn get_conversation_handler(&self) -> GetConversationHandler {
        GetConversationHandler::new(self.store.clone())
    }

    pub fn list_conversations_handler(&self) -> ListConversationsHandler {
        ListConversationsHandler::new(self.store.clone())
    }

    pub fn rename_conversation_handler(&self) -> RenameConversationHandler {
        RenameConversationHandler::new(self.store.clone())
    }

    pub fn remove_conversation_handler(&self) -> RemoveConversationHandler {
        RemoveConversationHandler::new(self.store.clone(), self.memories.clone())
    }

    pub fn list_messages_handler(&self) -> ListMessagesHandler {
        ListMessagesHandler::new(self.store.clone(), self.users.clone())
    }

    pub fn send_message_handler(&self) -> SendMessageHandler {
        SendMessageHandler::new(
            self.store.clone(),
            self.memories.clone(),
            self.scheduler.clone(),
        )
    }

    pub fn cancel_message_handler(&self) -> CancelMessageHandler {
        CancelMessageHandler::new(self.store.clone())
    }

    pub fn sync_user_handler(&self) -> SyncUserHandler {
        SyncUserHandler::new(self.users.clone())
    }
}
