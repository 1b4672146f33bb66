//! Conversation auto-titling.
//!
//! One non-streaming, schema-constrained completion per conversation. The
//! title is only written while the conversation is still unnamed, so an
//! explicit rename that lands first always wins.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::json;

use super::context::history_context;
use super::error::ChatError;
use crate::domain::conversation::prompt::TITLE_PROMPT;
use crate::domain::conversation::{clamp_title, Conversation};
use crate::ports::{ChatMessage, ChatProvider, ChatStore, JsonCompletionRequest};

static TITLE_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": { "title": { "type": "string" } },
        "required": ["title"],
        "additionalProperties": false
    })
});

/// Generates titles for unnamed conversations.
pub struct ConversationTitler {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn ChatStore>,
}

impl ConversationTitler {
    pub fn new(provider: Arc<dyn ChatProvider>, store: Arc<dyn ChatStore>) -> Self {
        Self { provider, store }
    }

    /// Titles `conversation` from its full history if it has no name yet.
    ///
    /// Returns the stored title, or `None` if the conversation was already
    /// named.
    ///
    /// # Errors
    ///
    /// - `Title` if the model returns no usable title
    /// - `Provider` / `Store` from the underlying calls
    pub async fn title_if_needed(
        &self,
        conversation: &Conversation,
    ) -> Result<Option<String>, ChatError> {
        if !conversation.needs_title() {
            return Ok(None);
        }

        let history = self.store.list_messages(conversation.id()).await?;
        let mut messages = vec![ChatMessage::system(TITLE_PROMPT)];
        messages.extend(history_context(&history, None));

        let reply = self
            .provider
            .complete_json(JsonCompletionRequest {
                messages,
                schema_name: "title".to_string(),
                schema: TITLE_SCHEMA.clone(),
            })
            .await?;

        let title = reply
            .get("title")
            .and_then(|t| t.as_str())
            .and_then(clamp_title)
            .ok_or_else(|| ChatError::Title("No title found".to_string()))?;

        let (updated, applied) = self
            .store
            .apply_generated_title(conversation.id(), &title)
            .await?;
        if applied {
            tracing::info!(conversation_id = %conversation.id(), title = %title, "Conversation titled");
        }
        Ok(applied.then(|| updated.name().unwrap_or_default().to_string()))
    }
}
