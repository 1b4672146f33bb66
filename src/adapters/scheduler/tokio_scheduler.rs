//! In-process task queue.
//!
//! Request handlers push onto an unbounded channel and return immediately.
//! The worker pulls tasks off in order and spawns each one, so a slow chat
//! run in one conversation never holds up another. Failures are logged and
//! the worker keeps going.
//!
//! ## Graceful Shutdown
//!
//! The worker stops taking new tasks when the shutdown signal fires and
//! waits for the ones already running.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::application::handlers::BackgroundTaskHandler;
use crate::ports::{BackgroundTask, SchedulerError, TaskScheduler};

/// Sending half of the task queue.
#[derive(Debug, Clone)]
pub struct TokioTaskScheduler {
    sender: mpsc::UnboundedSender<BackgroundTask>,
}

impl TokioTaskScheduler {
    /// Creates the queue. The receiver goes to [`TaskWorker::new`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BackgroundTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl TaskScheduler for TokioTaskScheduler {
    async fn schedule(&self, task: BackgroundTask) -> Result<(), SchedulerError> {
        self.sender.send(task).map_err(|_| SchedulerError::Closed)
    }
}

/// Receiving half: runs every task through the background handler.
pub struct TaskWorker {
    receiver: mpsc::UnboundedReceiver<BackgroundTask>,
    handler: Arc<BackgroundTaskHandler>,
}

impl TaskWorker {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<BackgroundTask>,
        handler: Arc<BackgroundTaskHandler>,
    ) -> Self {
        Self { receiver, handler }
    }

    /// Runs until shutdown is signalled or every scheduler handle is gone.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut running = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                task = self.receiver.recv() => {
                    let Some(task) = task else { break };
                    let handler = Arc::clone(&self.handler);
                    running.spawn(async move {
                        tracing::debug!(?task, "Running background task");
                        if let Err(err) = handler.handle(task.clone()).await {
                            tracing::error!(?task, error = %err, "Background task failed");
                        }
                    });
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Err(err) = joined {
                        tracing::error!(error = %err, "Background task panicked");
                    }
                }
            }
        }

        tracing::info!(in_flight = running.len(), "Task worker stopping");
        while let Some(joined) = running.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "Background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockChatProvider, MockEmbedder, ScriptedTurn};
    use crate::adapters::memory::{InMemoryChatStore, InMemoryMemoryStore};
    use crate::application::chat::ChatOrchestrator;
    use crate::application::memory::IndexMemoriesHandler;
    use crate::application::tools::ToolRegistry;
    use crate::domain::conversation::{Conversation, Message};
    use crate::domain::foundation::UserId;
    use crate::ports::ChatStore;
    use std::time::Duration;

    #[tokio::test]
    async fn schedule_after_worker_dropped_is_closed() {
        let (scheduler, receiver) = TokioTaskScheduler::channel();
        drop(receiver);
        assert_eq!(
            scheduler.schedule(BackgroundTask::IndexMemories).await,
            Err(SchedulerError::Closed)
        );
    }

    #[tokio::test]
    async fn worker_runs_chat_and_indexes_reply() {
        let store = Arc::new(InMemoryChatStore::new());
        let memories = Arc::new(InMemoryMemoryStore::new());
        let conversation = Conversation::new(UserId::new("alice").unwrap(), Some("Chat".into()));
        store.insert_conversation(&conversation).await.unwrap();
        let placeholder = Message::assistant_placeholder(conversation.id());
        store.insert_message(&placeholder).await.unwrap();

        let (scheduler, receiver) = TokioTaskScheduler::channel();
        let scheduler = Arc::new(scheduler);
        let handler = Arc::new(BackgroundTaskHandler::new(
            Arc::new(
                ChatOrchestrator::new(
                    Arc::new(MockChatProvider::new(vec![ScriptedTurn::message(["Hello"])])),
                    store.clone(),
                    Arc::new(ToolRegistry::new()),
                )
                .with_memory_queue(memories.clone(), scheduler.clone()),
            ),
            Arc::new(IndexMemoriesHandler::new(
                Arc::new(MockEmbedder::default()),
                memories.clone(),
                store.clone(),
            )),
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(TaskWorker::new(receiver, handler).run(shutdown_rx));

        scheduler
            .schedule(BackgroundTask::RunChat {
                conversation_id: conversation.id(),
                message_id: placeholder.id(),
            })
            .await
            .unwrap();

        let alice = UserId::new("alice").unwrap();
        for _ in 0..200 {
            if !memories.memories_for(&alice).is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(memories.memories_for(&alice).len(), 1);
        let reply = store.get_message(placeholder.id()).await.unwrap().unwrap();
        assert_eq!(reply.body(), "Hello");

        shutdown_tx.send(true).unwrap();
        worker.await.unwrap();
    }
}
