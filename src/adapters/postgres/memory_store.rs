//! PostgreSQL implementation of MemoryStore.
//!
//! Embeddings are stored as `float8[]` and ranked in process over the
//! user's rows, so no vector extension is needed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::db_error;
use crate::domain::foundation::{IndexJobId, MemoryId, MessageId, Timestamp, UserId};
use crate::domain::memory::{rank_memories, IndexJob, Memory, MemorySource, ScoredMemory};
use crate::ports::{MemoryStore, StoreError};

#[derive(Clone)]
pub struct PostgresMemoryStore {
    pool: PgPool,
}

impl PostgresMemoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemoryStore for PostgresMemoryStore {
    async fn enqueue(&self, job: &IndexJob) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO memories_to_index (id, message_id, queued_at) VALUES ($1, $2, $3)")
            .bind(job.id.as_uuid())
            .bind(job.source.message_id().as_uuid())
            .bind(job.queued_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(db_error("enqueue memory"))?;
        Ok(())
    }

    async fn next_job(&self) -> Result<Option<IndexJob>, StoreError> {
        let row = sqlx::query(
            "SELECT id, message_id, queued_at FROM memories_to_index ORDER BY seq LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch index job"))?;

        Ok(row.map(|row| {
            let id: Uuid = row.get("id");
            let message_id: Uuid = row.get("message_id");
            let queued_at: DateTime<Utc> = row.get("queued_at");
            IndexJob {
                id: IndexJobId::from_uuid(id),
                source: MemorySource::Message {
                    message_id: MessageId::from_uuid(message_id),
                },
                queued_at: Timestamp::from_datetime(queued_at),
            }
        }))
    }

    async fn complete_job(&self, job_id: IndexJobId, memory: &Memory) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("start transaction"))?;

        let dequeued = sqlx::query("DELETE FROM memories_to_index WHERE id = $1")
            .bind(job_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("dequeue index job"))?;
        if dequeued.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Index job",
                id: job_id.to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO memories (id, user_id, message_id, embedding, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(memory.id().as_uuid())
        .bind(memory.user_id().as_str())
        .bind(memory.source().message_id().as_uuid())
        .bind(memory.embedding())
        .bind(memory.created_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert memory"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(())
    }

    async fn search(
        &self,
        user: &UserId,
        embedding: &[f64],
        limit: usize,
    ) -> Result<Vec<ScoredMemory>, StoreError> {
        let memories = sqlx::query(
            "SELECT id, user_id, message_id, embedding, created_at FROM memories WHERE user_id = $1",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("fetch memories"))?
        .iter()
        .map(memory_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(rank_memories(embedding, &memories, limit))
    }

    async fn remove_for_message(&self, message_id: MessageId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("start transaction"))?;
        sqlx::query("DELETE FROM memories_to_index WHERE message_id = $1")
            .bind(message_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete index jobs"))?;
        sqlx::query("DELETE FROM memories WHERE message_id = $1")
            .bind(message_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete memories"))?;
        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(())
    }
}

fn memory_from_row(row: &PgRow) -> Result<Memory, StoreError> {
    let id: Uuid = row.get("id");
    let user_id: String = row.get("user_id");
    let message_id: Uuid = row.get("message_id");
    let created_at: DateTime<Utc> = row.get("created_at");
    Ok(Memory::reconstitute(
        MemoryId::from_uuid(id),
        UserId::new(user_id).map_err(|e| StoreError::Invalid(e.to_string()))?,
        MemorySource::Message {
            message_id: MessageId::from_uuid(message_id),
        },
        row.get::<Vec<f64>, _>("embedding"),
        Timestamp::from_datetime(created_at),
    ))
}
