//! GetConversationHandler - loads one conversation for its creator.

use std::sync::Arc;

use super::{load_owned, ConversationError};
use crate::domain::conversation::Conversation;
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::ChatStore;

#[derive(Debug, Clone)]
pub struct GetConversationQuery {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

pub struct GetConversationHandler {
    store: Arc<dyn ChatStore>,
}

impl GetConversationHandler {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetConversationQuery,
    ) -> Result<Conversation, ConversationError> {
        load_owned(self.store.as_ref(), query.conversation_id, &query.user_id).await
    }
}
