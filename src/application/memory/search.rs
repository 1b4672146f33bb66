//! Semantic search over one user's memories.

use std::sync::Arc;

use super::MemoryError;
use crate::domain::conversation::Agent;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::memory::{MemoryMatch, ASSISTANT_DISPLAY_NAME, MEMORY_QUERY_LIMIT};
use crate::ports::{ChatStore, Embedder, MemoryStore, UserRepository};

/// Embeds a query and returns the nearest memories of a single user,
/// enriched with the source message text, its age and its author's name.
pub struct MemorySearch {
    embedder: Arc<dyn Embedder>,
    memories: Arc<dyn MemoryStore>,
    chats: Arc<dyn ChatStore>,
    users: Arc<dyn UserRepository>,
}

impl MemorySearch {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        memories: Arc<dyn MemoryStore>,
        chats: Arc<dyn ChatStore>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            embedder,
            memories,
            chats,
            users,
        }
    }

    /// Returns up to [`MEMORY_QUERY_LIMIT`] matches, best first. Only
    /// `user`'s own memories are ever considered.
    pub async fn query(&self, user: &UserId, query: &str) -> Result<Vec<MemoryMatch>, MemoryError> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self
            .memories
            .search(user, &embedding, MEMORY_QUERY_LIMIT)
            .await?;

        let now = Timestamp::now();
        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            let message_id = hit.source.message_id();
            let message = self
                .chats
                .get_message(message_id)
                .await?
                .ok_or(MemoryError::MessageNotFound(message_id))?;

            let name = match message.agent() {
                Agent::User { id } => self
                    .users
                    .find(id)
                    .await?
                    .ok_or_else(|| MemoryError::UserNotFound(id.clone()))?
                    .display_name()
                    .to_string(),
                Agent::Assistant => ASSISTANT_DISPLAY_NAME.to_string(),
            };

            matches.push(MemoryMatch {
                score: hit.score,
                age_milliseconds: message.created_at().age_millis(&now),
                body: message.body().to_string(),
                name,
            });
        }

        tracing::debug!(user_id = %user, matches = matches.len(), "Memory query");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockEmbedder;
    use crate::adapters::memory::{InMemoryChatStore, InMemoryMemoryStore, InMemoryUserRepository};
    use crate::domain::conversation::{Conversation, Message};
    use crate::domain::memory::{Memory, MemorySource};
    use crate::domain::user::{EmailAddress, UserRecord};

    struct Fixture {
        search: MemorySearch,
        embedder: Arc<MockEmbedder>,
        memories: Arc<InMemoryMemoryStore>,
        chats: Arc<InMemoryChatStore>,
    }

    async fn fixture() -> Fixture {
        let embedder = Arc::new(MockEmbedder::default());
        let memories = Arc::new(InMemoryMemoryStore::new());
        let chats = Arc::new(InMemoryChatStore::new());
        let users = Arc::new(InMemoryUserRepository::new());
        for (id, name) in [("alice", "Alice"), ("bob", "Bob")] {
            users
                .upsert(
                    &UserRecord::new(
                        UserId::new(id).unwrap(),
                        vec![EmailAddress::verified(format!("{id}@example.com"))],
                    )
                    .with_first_name(name),
                )
                .await
                .unwrap();
        }
        let search = MemorySearch::new(
            embedder.clone(),
            memories.clone(),
            chats.clone(),
            users,
        );
        Fixture {
            search,
            embedder,
            memories,
            chats,
        }
    }

    async fn remember(f: &Fixture, user: &str, body: &str) {
        let user = UserId::new(user).unwrap();
        let conversation = Conversation::new(user.clone(), None);
        f.chats.insert_conversation(&conversation).await.unwrap();
        let message = Message::user(conversation.id(), user.clone(), body).unwrap();
        f.chats.insert_message(&message).await.unwrap();
        let memory = Memory::new(
            user,
            MemorySource::Message {
                message_id: message.id(),
            },
            f.embedder.embed(body).await.unwrap(),
        )
        .unwrap();
        let job = crate::domain::memory::IndexJob::for_message(message.id());
        f.memories.enqueue(&job).await.unwrap();
        f.memories.complete_job(job.id, &memory).await.unwrap();
    }

    #[tokio::test]
    async fn returns_matching_memory_with_author_name() {
        let f = fixture().await;
        remember(&f, "alice", "My favorite color is teal").await;
        remember(&f, "alice", "The weather in Lisbon was sunny").await;

        let matches = f
            .search
            .query(&UserId::new("alice").unwrap(), "favorite color")
            .await
            .unwrap();

        assert_eq!(matches[0].body, "My favorite color is teal");
        assert_eq!(matches[0].name, "Alice");
        assert!(matches[0].age_milliseconds >= 0);
    }

    #[tokio::test]
    async fn never_returns_other_users_memories() {
        let f = fixture().await;
        remember(&f, "bob", "My favorite color is teal").await;

        let matches = f
            .search
            .query(&UserId::new("alice").unwrap(), "favorite color")
            .await
            .unwrap();

        assert!(matches.is_empty());
    }
}
