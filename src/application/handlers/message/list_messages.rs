//! ListMessagesHandler - a conversation's messages as the client renders
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::super::conversation::{load_owned, ConversationError};
use crate::domain::conversation::{Agent, Message, ToolUse};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::{ChatStore, UserRepository};

#[derive(Debug, Clone)]
pub struct ListMessagesQuery {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

/// Who wrote a message, resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthorView {
    #[serde(rename_all = "camelCase")]
    User {
        name: String,
        image_url: Option<String>,
    },
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub message: Message,
    pub author: AuthorView,
    pub tool_uses: Vec<ToolUse>,
}

pub struct ListMessagesHandler {
    store: Arc<dyn ChatStore>,
    users: Arc<dyn UserRepository>,
}

impl ListMessagesHandler {
    pub fn new(store: Arc<dyn ChatStore>, users: Arc<dyn UserRepository>) -> Self {
        Self { store, users }
    }

    pub async fn handle(
        &self,
        query: ListMessagesQuery,
    ) -> Result<Vec<MessageView>, ConversationError> {
        // 1. Authorize
        load_owned(self.store.as_ref(), query.conversation_id, &query.user_id).await?;

        // 2. Load messages in creation order
        let messages = self.store.list_messages(query.conversation_id).await?;

        // 3. Resolve authors once per user and attach tool uses
        let mut authors: HashMap<UserId, AuthorView> = HashMap::new();
        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            let author = match message.agent() {
                Agent::Assistant => AuthorView::Assistant,
                Agent::User { id } => match authors.get(id) {
                    Some(view) => view.clone(),
                    None => {
                        let view = self.user_author(id).await?;
                        authors.insert(id.clone(), view.clone());
                        view
                    }
                },
            };
            let tool_uses = self.store.list_tool_uses(message.id()).await?;
            views.push(MessageView {
                message,
                author,
                tool_uses,
            });
        }
        Ok(views)
    }

    async fn user_author(&self, id: &UserId) -> Result<AuthorView, ConversationError> {
        let user = self
            .users
            .find(id)
            .await?
            .ok_or_else(|| ConversationError::UserNotFound(id.clone()))?;
        Ok(AuthorView::User {
            name: user.display_name().to_string(),
            image_url: user.image_url,
        })
    }
}
