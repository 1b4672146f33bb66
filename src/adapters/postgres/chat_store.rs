//! PostgreSQL implementation of ChatStore.
//!
//! Lifecycle writes lock the target row with `SELECT ... FOR UPDATE`, apply
//! the domain transition to the reconstituted record and write it back in
//! the same transaction. Tool-use writes also lock the parent message so a
//! concurrent cancel cannot slip in between the check and the write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::db_error;
use crate::domain::conversation::{
    Agent, Conversation, LifecycleError, Message, MessageState, ToolUse, ToolUseStatus,
};
use crate::domain::foundation::{
    ConversationId, MessageId, Timestamp, ToolUseId, UserId,
};
use crate::ports::{ChatStore, StoreError};

const CONVERSATION_COLUMNS: &str = "id, name, creator_id, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, author_id, body, status, error, created_at";
const TOOL_USE_COLUMNS: &str =
    "id, message_id, tool_name, tool_args, status, result, error, created_at";

// Parent first, then the tool use: the same order a cascading delete of the
// message takes its locks in.
const TOOL_USE_PARENT_SQL: &str = "SELECT message_id FROM tool_uses WHERE id = $1";
const LOCK_TOOL_USE_SQL: &str = "SELECT id, message_id, tool_name, tool_args, status, result, error, created_at \
     FROM tool_uses WHERE id = $1 FOR UPDATE";

/// PostgreSQL implementation of ChatStore.
#[derive(Clone)]
pub struct PostgresChatStore {
    pool: PgPool,
}

impl PostgresChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(db_error("start transaction"))
    }

    async fn update_message<F>(&self, id: MessageId, change: F) -> Result<Message, StoreError>
    where
        F: FnOnce(&mut Message) -> Result<(), LifecycleError> + Send,
    {
        let mut tx = self.begin().await?;
        let mut message = lock_message(&mut tx, id).await?;
        change(&mut message)?;

        let (status, error) = message_state_to_columns(message.state());
        sqlx::query("UPDATE messages SET body = $2, status = $3, error = $4 WHERE id = $1")
            .bind(message.id().as_uuid())
            .bind(message.body())
            .bind(status)
            .bind(error)
            .execute(&mut *tx)
            .await
            .map_err(db_error("update message"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(message)
    }

    async fn update_tool_use<F>(&self, id: ToolUseId, change: F) -> Result<ToolUse, StoreError>
    where
        F: FnOnce(&mut ToolUse) -> Result<(), LifecycleError> + Send,
    {
        let mut tx = self.begin().await?;
        let message_id: Uuid = sqlx::query_scalar(TOOL_USE_PARENT_SQL)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("fetch tool use parent"))?
            .ok_or_else(|| StoreError::tool_use_not_found(id))?;

        lock_message(&mut tx, MessageId::from_uuid(message_id))
            .await?
            .ensure_generating()?;

        let row = sqlx::query(LOCK_TOOL_USE_SQL)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("fetch tool use"))?
            .ok_or_else(|| StoreError::tool_use_not_found(id))?;
        let mut tool_use = tool_use_from_row(&row)?;
        change(&mut tool_use)?;

        let (status, result, error) = tool_status_to_columns(tool_use.status());
        sqlx::query(
            r#"
            UPDATE tool_uses SET tool_args = $2, status = $3, result = $4, error = $5
            WHERE id = $1
            "#,
        )
        .bind(tool_use.id().as_uuid())
        .bind(tool_use.tool_args())
        .bind(status)
        .bind(result)
        .bind(error)
        .execute(&mut *tx)
        .await
        .map_err(db_error("update tool use"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(tool_use)
    }
}

#[async_trait]
impl ChatStore for PostgresChatStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO conversations (id, name, creator_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.name())
        .bind(conversation.creator_id().as_str())
        .bind(conversation.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("insert conversation"))?;
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("fetch conversation"))?
        .as_ref()
        .map(conversation_from_row)
        .transpose()
    }

    async fn list_conversations(&self, creator: &UserId) -> Result<Vec<Conversation>, StoreError> {
        sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE creator_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(creator.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list conversations"))?
        .iter()
        .map(conversation_from_row)
        .collect()
    }

    async fn rename_conversation(
        &self,
        id: ConversationId,
        name: &str,
    ) -> Result<Conversation, StoreError> {
        let mut tx = self.begin().await?;
        let mut conversation = lock_conversation(&mut tx, id).await?;
        conversation.rename(name)?;
        write_conversation_name(&mut tx, &conversation).await?;
        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(conversation)
    }

    async fn apply_generated_title(
        &self,
        id: ConversationId,
        title: &str,
    ) -> Result<(Conversation, bool), StoreError> {
        let mut tx = self.begin().await?;
        let mut conversation = lock_conversation(&mut tx, id).await?;
        let applied = conversation.apply_generated_title(title);
        if applied {
            write_conversation_name(&mut tx, &conversation).await?;
        }
        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok((conversation, applied))
    }

    async fn remove_conversation(&self, id: ConversationId) -> Result<Vec<MessageId>, StoreError> {
        let mut tx = self.begin().await?;
        lock_conversation(&mut tx, id).await?;

        let removed: Vec<MessageId> =
            sqlx::query("SELECT id FROM messages WHERE conversation_id = $1 ORDER BY seq")
                .bind(id.as_uuid())
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error("list messages"))?
                .iter()
                .map(|row| MessageId::from_uuid(row.get("id")))
                .collect();

        // Messages and tool uses go with it via ON DELETE CASCADE.
        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete conversation"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(removed)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let (status, error) = message_state_to_columns(message.state());
        let author = match message.agent() {
            Agent::User { id } => Some(id.as_str()),
            Agent::Assistant => None,
        };
        let result = sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, author_id, body, status, error, created_at)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE EXISTS (SELECT 1 FROM conversations WHERE id = $2)
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(message.conversation_id().as_uuid())
        .bind(author)
        .bind(message.body())
        .bind(status)
        .bind(error)
        .bind(message.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("insert message"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conversation_not_found(message.conversation_id()));
        }
        Ok(())
    }

    async fn get_message(&self, id: MessageId) -> Result<Option<Message>, StoreError> {
        sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("fetch message"))?
            .as_ref()
            .map(message_from_row)
            .transpose()
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY seq"
        ))
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list messages"))?
        .iter()
        .map(message_from_row)
        .collect()
    }

    async fn patch_message_body(&self, id: MessageId, body: &str) -> Result<Message, StoreError> {
        self.update_message(id, |m| m.patch_body(body)).await
    }

    async fn complete_message(&self, id: MessageId) -> Result<Message, StoreError> {
        self.update_message(id, Message::complete).await
    }

    async fn fail_message(&self, id: MessageId, error: &str) -> Result<Message, StoreError> {
        self.update_message(id, |m| m.fail(error)).await
    }

    async fn cancel_message(&self, id: MessageId) -> Result<Message, StoreError> {
        self.update_message(id, Message::cancel).await
    }

    async fn start_tool_use(
        &self,
        message_id: MessageId,
        tool_name: &str,
    ) -> Result<ToolUse, StoreError> {
        let mut tx = self.begin().await?;
        lock_message(&mut tx, message_id)
            .await?
            .ensure_generating()?;

        let tool_use = ToolUse::start(message_id, tool_name);
        let (status, result, error) = tool_status_to_columns(tool_use.status());
        sqlx::query(
            r#"
            INSERT INTO tool_uses (id, message_id, tool_name, tool_args, status, result, error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(tool_use.id().as_uuid())
        .bind(message_id.as_uuid())
        .bind(tool_use.tool_name())
        .bind(tool_use.tool_args())
        .bind(status)
        .bind(result)
        .bind(error)
        .bind(tool_use.created_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("insert tool use"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;
        Ok(tool_use)
    }

    async fn set_tool_arguments(&self, id: ToolUseId, args: &str) -> Result<ToolUse, StoreError> {
        self.update_tool_use(id, |t| t.set_arguments(args)).await
    }

    async fn set_tool_in_progress(&self, id: ToolUseId) -> Result<ToolUse, StoreError> {
        self.update_tool_use(id, ToolUse::set_in_progress).await
    }

    async fn set_tool_success(&self, id: ToolUseId, result: &str) -> Result<ToolUse, StoreError> {
        self.update_tool_use(id, |t| t.set_success(result)).await
    }

    async fn set_tool_error(&self, id: ToolUseId, error: &str) -> Result<ToolUse, StoreError> {
        self.update_tool_use(id, |t| t.set_error(error)).await
    }

    async fn list_tool_uses(&self, message_id: MessageId) -> Result<Vec<ToolUse>, StoreError> {
        sqlx::query(&format!(
            "SELECT {TOOL_USE_COLUMNS} FROM tool_uses WHERE message_id = $1 ORDER BY seq"
        ))
        .bind(message_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list tool uses"))?
        .iter()
        .map(tool_use_from_row)
        .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Locking reads
// ════════════════════════════════════════════════════════════════════════════════

async fn lock_conversation(
    tx: &mut Transaction<'static, Postgres>,
    id: ConversationId,
) -> Result<Conversation, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("fetch conversation"))?
    .ok_or_else(|| StoreError::conversation_not_found(id))?;
    conversation_from_row(&row)
}

async fn lock_message(
    tx: &mut Transaction<'static, Postgres>,
    id: MessageId,
) -> Result<Message, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("fetch message"))?
    .ok_or_else(|| StoreError::message_not_found(id))?;
    message_from_row(&row)
}

async fn write_conversation_name(
    tx: &mut Transaction<'static, Postgres>,
    conversation: &Conversation,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE conversations SET name = $2 WHERE id = $1")
        .bind(conversation.id().as_uuid())
        .bind(conversation.name())
        .execute(&mut **tx)
        .await
        .map_err(db_error("update conversation"))?;
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════════

fn user_id(raw: String) -> Result<UserId, StoreError> {
    UserId::new(raw).map_err(|e| StoreError::Invalid(e.to_string()))
}

fn conversation_from_row(row: &PgRow) -> Result<Conversation, StoreError> {
    let id: Uuid = row.get("id");
    let created_at: DateTime<Utc> = row.get("created_at");
    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        row.get("name"),
        user_id(row.get("creator_id"))?,
        Timestamp::from_datetime(created_at),
    ))
}

fn message_from_row(row: &PgRow) -> Result<Message, StoreError> {
    let id: Uuid = row.get("id");
    let conversation_id: Uuid = row.get("conversation_id");
    let author: Option<String> = row.get("author_id");
    let status: String = row.get("status");
    let error: Option<String> = row.get("error");
    let created_at: DateTime<Utc> = row.get("created_at");

    let agent = match author {
        Some(raw) => Agent::User { id: user_id(raw)? },
        None => Agent::Assistant,
    };
    Ok(Message::reconstitute(
        MessageId::from_uuid(id),
        ConversationId::from_uuid(conversation_id),
        agent,
        row.get("body"),
        message_state_from_columns(&status, error)?,
        Timestamp::from_datetime(created_at),
    ))
}

fn tool_use_from_row(row: &PgRow) -> Result<ToolUse, StoreError> {
    let id: Uuid = row.get("id");
    let message_id: Uuid = row.get("message_id");
    let status: String = row.get("status");
    let created_at: DateTime<Utc> = row.get("created_at");
    Ok(ToolUse::reconstitute(
        ToolUseId::from_uuid(id),
        MessageId::from_uuid(message_id),
        row.get("tool_name"),
        row.get("tool_args"),
        tool_status_from_columns(&status, row.get("result"), row.get("error"))?,
        Timestamp::from_datetime(created_at),
    ))
}

fn message_state_to_columns(state: &MessageState) -> (&'static str, Option<&str>) {
    (state.status().as_str(), state.error())
}

fn message_state_from_columns(
    status: &str,
    error: Option<String>,
) -> Result<MessageState, StoreError> {
    match status {
        "generating" => Ok(MessageState::Generating),
        "complete" => Ok(MessageState::Complete),
        "error" => Ok(MessageState::Error {
            error: error.unwrap_or_default(),
        }),
        other => Err(StoreError::Invalid(format!("unknown message status: {other}"))),
    }
}

fn tool_status_to_columns(
    status: &ToolUseStatus,
) -> (&'static str, Option<&str>, Option<&str>) {
    let phase = status.phase().as_str();
    match status {
        ToolUseStatus::Success { result } => (phase, Some(result.as_str()), None),
        ToolUseStatus::Error { error } => (phase, None, Some(error.as_str())),
        ToolUseStatus::Generating | ToolUseStatus::InProgress => (phase, None, None),
    }
}

fn tool_status_from_columns(
    status: &str,
    result: Option<String>,
    error: Option<String>,
) -> Result<ToolUseStatus, StoreError> {
    match status {
        "generating" => Ok(ToolUseStatus::Generating),
        "in_progress" => Ok(ToolUseStatus::InProgress),
        "success" => Ok(ToolUseStatus::Success {
            result: result.unwrap_or_default(),
        }),
        "error" => Ok(ToolUseStatus::Error {
            error: error.unwrap_or_default(),
        }),
        other => Err(StoreError::Invalid(format!("unknown tool use status: {other}"))),
    }
}
