//! Memory module - long-term memories built from completed messages.
//!
//! Completed messages are queued for indexing; the indexer embeds each
//! one and stores the vector under the conversation creator. Searches are
//! always scoped to a single user.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, IndexJobId, MemoryId, MessageId, Timestamp, UserId,
};

/// Number of neighbours returned by a memory query.
pub const MEMORY_QUERY_LIMIT: usize = 15;

/// Display name attributed to assistant-authored memories.
pub const ASSISTANT_DISPLAY_NAME: &str = "OpenAI";

/// What a memory was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MemorySource {
    Message {
        #[serde(rename = "messageId")]
        message_id: MessageId,
    },
}

impl MemorySource {
    pub fn message_id(&self) -> MessageId {
        match self {
            MemorySource::Message { message_id } => *message_id,
        }
    }
}

/// An entry waiting in the indexing queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: IndexJobId,
    pub source: MemorySource,
    pub queued_at: Timestamp,
}

impl IndexJob {
    pub fn for_message(message_id: MessageId) -> Self {
        Self {
            id: IndexJobId::new(),
            source: MemorySource::Message { message_id },
            queued_at: Timestamp::now(),
        }
    }
}

/// The next queued job, resolved against its source message.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingIndex {
    pub job_id: IndexJobId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub body: String,
}

/// An embedded excerpt owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    id: MemoryId,
    user_id: UserId,
    source: MemorySource,
    embedding: Vec<f64>,
    created_at: Timestamp,
}

impl Memory {
    /// Creates a memory, rejecting an empty embedding.
    pub fn new(
        user_id: UserId,
        source: MemorySource,
        embedding: Vec<f64>,
    ) -> Result<Self, DomainError> {
        if embedding.is_empty() {
            return Err(DomainError::validation("embedding", "Embedding cannot be empty"));
        }
        Ok(Self {
            id: MemoryId::new(),
            user_id,
            source,
            embedding,
            created_at: Timestamp::now(),
        })
    }

    pub fn reconstitute(
        id: MemoryId,
        user_id: UserId,
        source: MemorySource,
        embedding: Vec<f64>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            source,
            embedding,
            created_at,
        }
    }

    pub fn id(&self) -> MemoryId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn source(&self) -> &MemorySource {
        &self.source
    }

    pub fn embedding(&self) -> &[f64] {
        &self.embedding
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }
}

/// A memory ranked against a query, before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub memory_id: MemoryId,
    pub source: MemorySource,
    pub score: f64,
}

/// What the memory tool hands back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMatch {
    #[serde(rename = "_score")]
    pub score: f64,
    pub age_milliseconds: i64,
    pub body: String,
    pub name: String,
}

/// Cosine similarity of two vectors; zero when either has no magnitude or
/// the dimensions differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Ranks memories by similarity to `query`, best first, keeping `limit`.
pub fn rank_memories<'a>(
    query: &[f64],
    memories: impl IntoIterator<Item = &'a Memory>,
    limit: usize,
) -> Vec<ScoredMemory> {
    let mut scored: Vec<ScoredMemory> = memories
        .into_iter()
        .map(|m| ScoredMemory {
            memory_id: m.id(),
            source: *m.source(),
            score: cosine_similarity(query, m.embedding()),
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    fn memory(embedding: Vec<f64>) -> Memory {
        Memory::new(
            user(),
            MemorySource::Message {
                message_id: MessageId::new(),
            },
            embedding,
        )
        .unwrap()
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn ranking_orders_best_first_and_truncates() {
        let near = memory(vec![1.0, 0.0]);
        let mid = memory(vec![1.0, 1.0]);
        let far = memory(vec![0.0, 1.0]);
        let ranked = rank_memories(&[1.0, 0.0], [&far, &near, &mid], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].memory_id, near.id());
        assert_eq!(ranked[1].memory_id, mid.id());
    }

    #[test]
    fn empty_embedding_is_rejected() {
        let result = Memory::new(
            user(),
            MemorySource::Message {
                message_id: MessageId::new(),
            },
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn match_serializes_with_wire_names() {
        let m = MemoryMatch {
            score: 0.9,
            age_milliseconds: 1000,
            body: "My favorite color is teal".into(),
            name: "Ada".into(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["_score"], 0.9);
        assert_eq!(json["ageMilliseconds"], 1000);
        assert_eq!(json["body"], "My favorite color is teal");
    }
}
