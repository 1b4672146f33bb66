//! WebSocket upgrade handler for the live conversation feed.
//!
//! Connection lifecycle:
//! 1. Authenticate (bearer header or `?token=`, since browsers cannot set
//!    headers on a socket) and check the caller owns the conversation
//! 2. Upgrade to WebSocket
//! 3. Join the conversation's room
//! 4. Forward committed changes and answer pings until disconnect
//! 5. Leave the room

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::adapters::http::middleware::bearer_token;
use crate::adapters::http::ApiError;
use crate::application::handlers::{GetConversationHandler, GetConversationQuery, UserAccessHandler};
use crate::domain::foundation::{AuthError, AuthenticatedUser, ConversationId, Timestamp};
use crate::ports::{ChatStore, SessionValidator};

use super::{
    messages::{ClientMessage, ConnectedMessage, ErrorMessage, PongMessage, ServerMessage},
    rooms::{ClientId, RoomManager},
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub rooms: Arc<RoomManager>,
    pub store: Arc<dyn ChatStore>,
    pub sessions: Arc<dyn SessionValidator>,
    pub access: Arc<UserAccessHandler>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveQuery {
    pub token: Option<String>,
}

/// Handle WebSocket upgrade requests for a conversation.
///
/// Route: `GET /api/conversations/:id/live`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    Query(query): Query<LiveQuery>,
    headers: HeaderMap,
    State(state): State<WebSocketState>,
) -> Response {
    let conversation_id: ConversationId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return ApiError::BadRequest("Invalid conversation ID format".to_string())
                .into_response()
        }
    };

    if let Err(e) = authorize(&state, conversation_id, &headers, query.token.as_deref()).await {
        return e.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, conversation_id, state))
}

async fn authorize(
    state: &WebSocketState,
    conversation_id: ConversationId,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<AuthenticatedUser, ApiError> {
    let token = bearer_token(headers)
        .or(query_token)
        .ok_or(AuthError::MissingToken)?;
    let identity = state.sessions.validate(token).await?;
    let user = state.access.require_user(&identity).await?;

    GetConversationHandler::new(state.store.clone())
        .handle(GetConversationQuery {
            conversation_id,
            user_id: user.id,
        })
        .await?;
    Ok(identity)
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, conversation_id: ConversationId, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = ClientId::new();
    let mut updates = state.rooms.join(conversation_id, client_id.clone());

    let connected = ServerMessage::Connected(ConnectedMessage {
        conversation_id: conversation_id.to_string(),
        client_id: client_id.to_string(),
        timestamp: Timestamp::now().as_datetime().to_rfc3339(),
    });
    if send_message(&mut sender, &connected).await.is_err() {
        drop(updates);
        state.rooms.leave(&client_id);
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                let outgoing = match update {
                    Ok(event) => ServerMessage::Update { event },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(%client_id, skipped, "Client lagged behind");
                        ServerMessage::Lagged { skipped }
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Err(e) = send_message(&mut sender, &outgoing).await {
                    tracing::debug!(%client_id, "Send error, closing connection: {}", e);
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => ServerMessage::Pong(PongMessage::now()),
                            Err(e) => ServerMessage::Error(ErrorMessage {
                                code: "BAD_MESSAGE".to_string(),
                                message: e.to_string(),
                            }),
                        };
                        if send_message(&mut sender, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!(%client_id, "Received unsupported binary message");
                    }
                    // Protocol pings are answered by axum
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(%client_id, "Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(%client_id, "Receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    drop(updates);
    state.rooms.leave(&client_id);
}

/// Send a JSON message over the WebSocket.
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}

/// Router for the WebSocket endpoint, nested under `/api`.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/conversations/:id/live", get(ws_handler))
}
