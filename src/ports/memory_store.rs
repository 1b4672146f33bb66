//! Memory store port - indexing queue and per-user vector store.

use async_trait::async_trait;

use crate::domain::foundation::{IndexJobId, MessageId, UserId};
use crate::domain::memory::{IndexJob, Memory, ScoredMemory};

use super::StoreError;

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Adds a job to the indexing queue.
    async fn enqueue(&self, job: &IndexJob) -> Result<(), StoreError>;

    /// Oldest queued job, if any.
    async fn next_job(&self) -> Result<Option<IndexJob>, StoreError>;

    /// Stores the memory and removes its job from the queue, atomically.
    async fn complete_job(&self, job_id: IndexJobId, memory: &Memory) -> Result<(), StoreError>;

    /// Nearest neighbours among `user`'s memories only, best first.
    async fn search(
        &self,
        user: &UserId,
        embedding: &[f64],
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, StoreError>;

    /// Removes queued jobs and stored memories built from a message.
    async fn remove_for_message(&self, message_id: MessageId) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_is_object_safe() {
        fn _accepts_dyn(_: &dyn MemoryStore) {}
    }
}
