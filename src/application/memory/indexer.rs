//! Memory indexer - turns queued messages into stored embeddings.

use std::sync::Arc;

use super::MemoryError;
use crate::domain::foundation::MemoryId;
use crate::domain::memory::{Memory, MemorySource, PendingIndex};
use crate::ports::{ChatStore, Embedder, MemoryStore};

/// What one indexing pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The queue was empty.
    Idle,
    /// One entry was embedded and dequeued.
    Indexed(MemoryId),
}

/// Processes the oldest entry of the indexing queue.
///
/// The memory is keyed by the conversation creator, so an assistant reply
/// is remembered for the user it was written to.
pub struct IndexMemoriesHandler {
    embedder: Arc<dyn Embedder>,
    memories: Arc<dyn MemoryStore>,
    chats: Arc<dyn ChatStore>,
}

impl IndexMemoriesHandler {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        memories: Arc<dyn MemoryStore>,
        chats: Arc<dyn ChatStore>,
    ) -> Self {
        Self {
            embedder,
            memories,
            chats,
        }
    }

    /// Indexes one queued entry.
    ///
    /// # Errors
    ///
    /// - `MessageNotComplete` if the source message is still generating or
    ///   failed
    /// - `Embedding` if the embedding call fails; the entry stays queued
    pub async fn handle(&self) -> Result<IndexOutcome, MemoryError> {
        let Some(pending) = self.next_pending().await? else {
            return Ok(IndexOutcome::Idle);
        };

        let embedding = self.embedder.embed(&pending.body).await?;
        let memory = Memory::new(
            pending.user_id,
            MemorySource::Message {
                message_id: pending.message_id,
            },
            embedding,
        )
        .map_err(|e| MemoryError::InvalidEmbedding(e.message))?;

        self.memories.complete_job(pending.job_id, &memory).await?;
        tracing::debug!(message_id = %pending.message_id, memory_id = %memory.id(), "Indexed memory");
        Ok(IndexOutcome::Indexed(memory.id()))
    }

    /// Indexes entries until the queue is empty. Returns how many were
    /// indexed.
    pub async fn drain(&self) -> Result<usize, MemoryError> {
        let mut indexed = 0;
        while let IndexOutcome::Indexed(_) = self.handle().await? {
            indexed += 1;
        }
        Ok(indexed)
    }

    /// Oldest job whose source still exists. Jobs for removed messages or
    /// conversations are dropped on the way.
    async fn next_pending(&self) -> Result<Option<PendingIndex>, MemoryError> {
        loop {
            let Some(job) = self.memories.next_job().await? else {
                return Ok(None);
            };
            let message_id = job.source.message_id();

            let Some(message) = self.chats.get_message(message_id).await? else {
                tracing::warn!(%message_id, "Dropping index job for removed message");
                self.memories.remove_for_message(message_id).await?;
                continue;
            };
            if !message.is_complete() {
                return Err(MemoryError::MessageNotComplete(message_id));
            }
            let conversation_id = message.conversation_id();
            let Some(conversation) = self.chats.get_conversation(conversation_id).await? else {
                tracing::warn!(%message_id, %conversation_id, "Dropping index job for removed conversation");
                self.memories.remove_for_message(message_id).await?;
                continue;
            };

            return Ok(Some(PendingIndex {
                job_id: job.id,
                message_id,
                user_id: conversation.creator_id().clone(),
                body: message.body().to_string(),
            }));
        }
    }
}
