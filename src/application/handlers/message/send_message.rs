//! SendMessageHandler - posts a user message and starts the reply.

use std::sync::Arc;

use super::super::conversation::{load_owned, ConversationError};
use crate::domain::conversation::Message;
use crate::domain::foundation::{ConversationId, UserId};
use crate::domain::memory::IndexJob;
use crate::ports::{BackgroundTask, ChatStore, MemoryStore, TaskScheduler};

#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub user_message: Message,
    /// Placeholder the chat run streams into.
    pub assistant_message: Message,
}

/// Inserts the user message and the assistant placeholder, then hands the
/// reply off to the background worker.
pub struct SendMessageHandler {
    store: Arc<dyn ChatStore>,
    memories: Arc<dyn MemoryStore>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl SendMessageHandler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        memories: Arc<dyn MemoryStore>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            store,
            memories,
            scheduler,
        }
    }

    pub async fn handle(
        &self,
        cmd: SendMessageCommand,
    ) -> Result<SendMessageResult, ConversationError> {
        // 1. Authorize
        load_owned(self.store.as_ref(), cmd.conversation_id, &cmd.user_id).await?;

        // 2. Persist the user's message
        let user_message = Message::user(cmd.conversation_id, cmd.user_id, cmd.body)?;
        self.store.insert_message(&user_message).await?;

        // 3. Queue it for memory indexing
        self.memories
            .enqueue(&IndexJob::for_message(user_message.id()))
            .await?;
        self.scheduler.schedule(BackgroundTask::IndexMemories).await?;

        // 4. Insert the placeholder and start the run
        let assistant_message = Message::assistant_placeholder(cmd.conversation_id);
        self.store.insert_message(&assistant_message).await?;
        self.scheduler
            .schedule(BackgroundTask::RunChat {
                conversation_id: cmd.conversation_id,
                message_id: assistant_message.id(),
            })
            .await?;

        tracing::debug!(
            conversation_id = %cmd.conversation_id,
            message_id = %assistant_message.id(),
            "Message sent, chat run scheduled"
        );

        Ok(SendMessageResult {
            user_message,
            assistant_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryChatStore, InMemoryMemoryStore};
    use crate::adapters::scheduler::RecordingScheduler;
    use crate::domain::conversation::{Conversation, PLACEHOLDER_BODY};

    struct Fixture {
        handler: SendMessageHandler,
        store: Arc<InMemoryChatStore>,
        memories: Arc<InMemoryMemoryStore>,
        scheduler: Arc<RecordingScheduler>,
        conversation: Conversation,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryChatStore::new());
        let memories = Arc::new(InMemoryMemoryStore::new());
        let scheduler = Arc::new(RecordingScheduler::new());
        let conversation = Conversation::new(UserId::new("alice").unwrap(), None);
        store.insert_conversation(&conversation).await.unwrap();
        Fixture {
            handler: SendMessageHandler::new(store.clone(), memories.clone(), scheduler.clone()),
            store,
            memories,
            scheduler,
            conversation,
        }
    }

    fn command(f: &Fixture, user: &str, body: &str) -> SendMessageCommand {
        SendMessageCommand {
            conversation_id: f.conversation.id(),
            user_id: UserId::new(user).unwrap(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn inserts_both_messages_and_schedules_work() {
        let f = fixture().await;
        let result = f
            .handler
            .handle(command(&f, "alice", "My favorite color is teal"))
            .await
            .unwrap();

        let messages = f.store.list_messages(f.conversation.id()).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_complete());
        assert_eq!(messages[1].body(), PLACEHOLDER_BODY);
        assert!(messages[1].is_generating());

        let job = f.memories.next_job().await.unwrap().unwrap();
        assert_eq!(job.source.message_id(), result.user_message.id());

        assert_eq!(
            f.scheduler.tasks(),
            vec![
                BackgroundTask::IndexMemories,
                BackgroundTask::RunChat {
                    conversation_id: f.conversation.id(),
                    message_id: result.assistant_message.id(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn blank_body_is_rejected_before_any_write() {
        let f = fixture().await;
        let err = f.handler.handle(command(&f, "alice", "  ")).await.unwrap_err();
        assert!(matches!(err, ConversationError::Validation(_)));
        assert!(f.store.list_messages(f.conversation.id()).await.unwrap().is_empty());
        assert!(f.scheduler.tasks().is_empty());
    }

    #[tokio::test]
    async fn non_creator_cannot_send() {
        let f = fixture().await;
        let err = f.handler.handle(command(&f, "bob", "hi")).await.unwrap_err();
        assert_eq!(err, ConversationError::Forbidden);
        assert!(f.scheduler.tasks().is_empty());
    }
}
