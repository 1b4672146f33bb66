//! Request and response bodies for the chat API.
//!
//! Domain entities keep their fields private; these views flatten them into
//! the camelCase JSON the web client reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::handlers::{AuthorView, MessageView};
use crate::domain::conversation::{Conversation, Message, ToolUse, ToolUseStatus};
use crate::domain::user::{LoginStatus, UserRecord};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameConversationRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub id: String,
    pub name: Option<String>,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationDto {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id().to_string(),
            name: c.name().map(str::to_owned),
            creator_id: c.creator_id().to_string(),
            created_at: *c.created_at().as_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseDto {
    pub id: String,
    pub message_id: String,
    pub tool_name: String,
    pub tool_args: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ToolUse> for ToolUseDto {
    fn from(t: &ToolUse) -> Self {
        let (result, error) = match t.status() {
            ToolUseStatus::Success { result } => (Some(result.clone()), None),
            ToolUseStatus::Error { error } => (None, Some(error.clone())),
            ToolUseStatus::Generating | ToolUseStatus::InProgress => (None, None),
        };
        Self {
            id: t.id().to_string(),
            message_id: t.message_id().to_string(),
            tool_name: t.tool_name().to_string(),
            tool_args: t.tool_args().to_string(),
            status: t.status().phase().as_str(),
            result,
            error,
            created_at: *t.created_at().as_datetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub conversation_id: String,
    pub author: AuthorView,
    pub body: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub tool_uses: Vec<ToolUseDto>,
}

impl MessageDto {
    pub fn new(message: &Message, author: AuthorView, tool_uses: &[ToolUse]) -> Self {
        Self {
            id: message.id().to_string(),
            conversation_id: message.conversation_id().to_string(),
            author,
            body: message.body().to_string(),
            status: message.state().status().as_str(),
            error: message.state().error().map(str::to_owned),
            created_at: *message.created_at().as_datetime(),
            tool_uses: tool_uses.iter().map(ToolUseDto::from).collect(),
        }
    }

    /// A message the given user just wrote.
    pub fn authored_by(message: &Message, user: &UserRecord) -> Self {
        Self::new(
            message,
            AuthorView::User {
                name: user.display_name().to_string(),
                image_url: user.image_url.clone(),
            },
            &[],
        )
    }

    /// A fresh assistant message, before any tool use.
    pub fn assistant(message: &Message) -> Self {
        Self::new(message, AuthorView::Assistant, &[])
    }
}

impl From<&MessageView> for MessageDto {
    fn from(view: &MessageView) -> Self {
        Self::new(&view.message, view.author.clone(), &view.tool_uses)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub user_message: MessageDto,
    pub assistant_message: MessageDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveConversationResponse {
    pub removed_messages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginStatusResponse {
    pub status: LoginStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: String,
    pub first_name: Option<String>,
    pub image_url: Option<String>,
}

impl From<&UserRecord> for CurrentUserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            first_name: user.first_name.clone(),
            image_url: user.image_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn conversation_serializes_camel_case() {
        let conversation =
            Conversation::new(UserId::new("user_1").unwrap(), Some("Trip planning".into()));
        let json = serde_json::to_value(ConversationDto::from(&conversation)).unwrap();
        assert_eq!(json["name"], "Trip planning");
        assert_eq!(json["creatorId"], "user_1");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn generating_message_has_no_error_field() {
        let message = Message::assistant_placeholder(
            Conversation::new(UserId::new("user_1").unwrap(), None).id(),
        );
        let json = serde_json::to_value(MessageDto::assistant(&message)).unwrap();
        assert_eq!(json["status"], "generating");
        assert_eq!(json["author"]["type"], "assistant");
        assert!(json.get("error").is_none());
        assert_eq!(json["toolUses"], serde_json::json!([]));
    }

    #[test]
    fn tool_use_flattens_its_outcome() {
        let message = Message::assistant_placeholder(
            Conversation::new(UserId::new("user_1").unwrap(), None).id(),
        );
        let mut tool_use = ToolUse::start(message.id(), "queryMemory");
        tool_use.set_arguments(r#"{"query":"cats"}"#).unwrap();
        tool_use.set_in_progress().unwrap();
        tool_use.set_success("[]").unwrap();

        let json = serde_json::to_value(ToolUseDto::from(&tool_use)).unwrap();
        assert_eq!(json["toolName"], "queryMemory");
        assert_eq!(json["status"], "success");
        assert_eq!(json["result"], "[]");
    }

    #[test]
    fn login_status_uses_display_strings() {
        let json = serde_json::to_value(LoginStatusResponse {
            status: LoginStatus::NoClerkUser,
        })
        .unwrap();
        assert_eq!(json["status"], "No Clerk user");
    }
}
