//! Task scheduler port - deferred work launched after a request commits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{ConversationId, MessageId};

/// Work that runs outside the request that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackgroundTask {
    /// Drive the assistant reply for a freshly sent user message.
    RunChat {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    /// Drain the memory indexing queue.
    IndexMemories,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("task scheduler is shut down")]
    Closed,
}

#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Enqueues a task; returns as soon as it is accepted.
    async fn schedule(&self, task: BackgroundTask) -> Result<(), SchedulerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_with_type_tag() {
        let json = serde_json::to_value(BackgroundTask::IndexMemories).unwrap();
        assert_eq!(json, serde_json::json!({"type": "index_memories"}));
    }

    #[test]
    fn task_scheduler_is_object_safe() {
        fn _accepts_dyn(_: &dyn TaskScheduler) {}
    }
}
