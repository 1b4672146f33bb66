//! BackgroundTaskHandler - executes tasks taken off the scheduler queue.

use std::sync::Arc;

use thiserror::Error;

use crate::application::chat::{ChatError, ChatOrchestrator, RunChatCommand};
use crate::application::memory::{IndexMemoriesHandler, MemoryError};
use crate::ports::BackgroundTask;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackgroundTaskError {
    #[error("chat run failed: {0}")]
    Chat(#[from] ChatError),

    #[error("memory indexing failed: {0}")]
    Memory(#[from] MemoryError),
}

/// Runs chat replies and memory indexing.
pub struct BackgroundTaskHandler {
    orchestrator: Arc<ChatOrchestrator>,
    indexer: Arc<IndexMemoriesHandler>,
}

impl BackgroundTaskHandler {
    pub fn new(orchestrator: Arc<ChatOrchestrator>, indexer: Arc<IndexMemoriesHandler>) -> Self {
        Self {
            orchestrator,
            indexer,
        }
    }

    pub async fn handle(&self, task: BackgroundTask) -> Result<(), BackgroundTaskError> {
        match task {
            BackgroundTask::RunChat {
                conversation_id,
                message_id,
            } => {
                self.orchestrator
                    .handle(RunChatCommand::new(conversation_id, message_id))
                    .await?;
                Ok(())
            }
            BackgroundTask::IndexMemories => {
                let indexed = self.indexer.drain().await?;
                tracing::debug!(indexed, "Memory queue drained");
                Ok(())
            }
        }
    }
}
