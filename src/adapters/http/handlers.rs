//! HTTP handlers for conversations, messages and the current user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::dto::{
    ConversationDto, CreateConversationRequest, CurrentUserResponse, LoginStatusResponse,
    MessageDto, RemoveConversationResponse, RenameConversationRequest, SendMessageRequest,
    SendMessageResponse,
};
use super::error::ApiError;
use super::middleware::{CurrentUser, OptionalAuth};
use super::state::AppState;
use crate::application::handlers::{
    CancelMessageCommand, CreateConversationCommand, GetConversationQuery,
    ListConversationsQuery, ListMessagesQuery, RemoveConversationCommand,
    RenameConversationCommand, SendMessageCommand,
};
use crate::domain::foundation::{ConversationId, MessageId};

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid conversation ID format".to_string()))
}

fn parse_message_id(raw: &str) -> Result<MessageId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid message ID format".to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Current user
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/me/status - login status, for signed-out callers too
pub async fn login_status(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.access.status(identity.as_ref()).await?;
    Ok(Json(LoginStatusResponse { status }))
}

/// GET /api/me
pub async fn current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(CurrentUserResponse::from(&user))
}

// ════════════════════════════════════════════════════════════════════════════════
// Conversations
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations - caller's conversations, newest first
pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state
        .list_conversations_handler()
        .handle(ListConversationsQuery { user_id: user.id })
        .await?;
    let body: Vec<ConversationDto> = conversations.iter().map(ConversationDto::from).collect();
    Ok(Json(body))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Option<Json<CreateConversationRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let name = request.and_then(|Json(r)| r.name);
    let conversation = state
        .create_conversation_handler()
        .handle(CreateConversationCommand {
            user_id: user.id,
            name,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ConversationDto::from(&conversation))))
}

/// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .get_conversation_handler()
        .handle(GetConversationQuery {
            conversation_id: parse_conversation_id(&id)?,
            user_id: user.id,
        })
        .await?;
    Ok(Json(ConversationDto::from(&conversation)))
}

/// PATCH /api/conversations/:id
pub async fn rename_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<RenameConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .rename_conversation_handler()
        .handle(RenameConversationCommand {
            conversation_id: parse_conversation_id(&id)?,
            user_id: user.id,
            name: request.name,
        })
        .await?;
    Ok(Json(ConversationDto::from(&conversation)))
}

/// DELETE /api/conversations/:id
pub async fn remove_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .remove_conversation_handler()
        .handle(RemoveConversationCommand {
            conversation_id: parse_conversation_id(&id)?,
            user_id: user.id,
        })
        .await?;
    Ok(Json(RemoveConversationResponse {
        removed_messages: result.removed_messages,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations/:id/messages - oldest first, with authors and tool uses
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let views = state
        .list_messages_handler()
        .handle(ListMessagesQuery {
            conversation_id: parse_conversation_id(&id)?,
            user_id: user.id,
        })
        .await?;
    let body: Vec<MessageDto> = views.iter().map(MessageDto::from).collect();
    Ok(Json(body))
}

/// POST /api/conversations/:id/messages - returns both new messages; the
/// reply is generated in the background
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .send_message_handler()
        .handle(SendMessageCommand {
            conversation_id: parse_conversation_id(&id)?,
            user_id: user.id.clone(),
            body: request.body,
        })
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SendMessageResponse {
            user_message: MessageDto::authored_by(&result.user_message, &user),
            assistant_message: MessageDto::assistant(&result.assistant_message),
        }),
    ))
}

/// POST /api/messages/:id/cancel
pub async fn cancel_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .cancel_message_handler()
        .handle(CancelMessageCommand {
            message_id: parse_message_id(&id)?,
            user_id: user.id,
        })
        .await?;
    Ok(Json(MessageDto::assistant(&message)))
}
