//! ListConversationsHandler - the caller's conversations, newest first.

use std::sync::Arc;

use super::ConversationError;
use crate::domain::conversation::Conversation;
use crate::domain::foundation::UserId;
use crate::ports::ChatStore;

#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
}

pub struct ListConversationsHandler {
    store: Arc<dyn ChatStore>,
}

impl ListConversationsHandler {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Vec<Conversation>, ConversationError> {
        Ok(self.store.list_conversations(&query.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryChatStore;
    use crate::domain::foundation::{ConversationId, Timestamp};

    #[tokio::test]
    async fn lists_only_own_conversations_newest_first() {
        let store = Arc::new(InMemoryChatStore::new());
        let alice = UserId::new("alice").unwrap();
        let older = Conversation::reconstitute(
            ConversationId::new(),
            Some("Older".into()),
            alice.clone(),
            Timestamp::now().plus_millis(-1_000),
        );
        let newer = Conversation::new(alice.clone(), Some("Newer".into()));
        let foreign = Conversation::new(UserId::new("bob").unwrap(), None);
        for c in [&older, &newer, &foreign] {
            store.insert_conversation(c).await.unwrap();
        }

        let listed = ListConversationsHandler::new(store)
            .handle(ListConversationsQuery { user_id: alice })
            .await
            .unwrap();

        let names: Vec<_> = listed.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec![Some("Newer"), Some("Older")]);
    }
}
