//! In-memory memory store: a FIFO indexing queue plus a flat vector list.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::RwLock;

use super::{read, write};
use crate::domain::foundation::{IndexJobId, MessageId, UserId};
use crate::domain::memory::{rank_memories, IndexJob, Memory, ScoredMemory};
use crate::ports::{MemoryStore, StoreError};

#[derive(Default)]
struct State {
    queue: VecDeque<IndexJob>,
    memories: Vec<Memory>,
}

#[derive(Default)]
pub struct InMemoryMemoryStore {
    state: RwLock<State>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All memories stored for `user`, oldest first.
    pub fn memories_for(&self, user: &UserId) -> Vec<Memory> {
        read(&self.state)
            .memories
            .iter()
            .filter(|m| m.user_id() == user)
            .cloned()
            .collect()
    }

    pub fn queue_len(&self) -> usize {
        read(&self.state).queue.len()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn enqueue(&self, job: &IndexJob) -> Result<(), StoreError> {
        write(&self.state).queue.push_back(job.clone());
        Ok(())
    }

    async fn next_job(&self) -> Result<Option<IndexJob>, StoreError> {
        Ok(read(&self.state).queue.front().cloned())
    }

    async fn complete_job(&self, job_id: IndexJobId, memory: &Memory) -> Result<(), StoreError> {
        let mut state = write(&self.state);
        let position = state
            .queue
            .iter()
            .position(|job| job.id == job_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Index job",
                id: job_id.to_string(),
            })?;
        state.queue.remove(position);
        state.memories.push(memory.clone());
        Ok(())
    }

    async fn search(
        &self,
        user: &UserId,
        embedding: &[f64],
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, StoreError> {
        let state = read(&self.state);
        Ok(rank_memories(
            embedding,
            state.memories.iter().filter(|m| m.user_id() == user),
            limit,
        ))
    }

    async fn remove_for_message(&self, message_id: MessageId) -> Result<(), StoreError> {
        let mut state = write(&self.state);
        state
            .queue
            .retain(|job| job.source.message_id() != message_id);
        state
            .memories
            .retain(|m| m.source().message_id() != message_id);
        Ok(())
    }
}
