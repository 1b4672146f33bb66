//! WebSocket message types for the live conversation feed.
//!
//! - Server → Client: connection status, committed changes, errors, pongs
//! - Client → Server: pings

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::ports::ChatEvent;

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established and room joined.
    Connected(ConnectedMessage),

    /// A committed change in the conversation.
    #[serde(rename = "chat.update")]
    Update { event: ChatEvent },

    /// The client fell behind and missed `skipped` updates; it should
    /// refetch the conversation.
    Lagged { skipped: u64 },

    Error(ErrorMessage),

    Pong(PongMessage),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub conversation_id: String,
    pub client_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl PongMessage {
    pub fn now() -> Self {
        Self {
            timestamp: Timestamp::now().as_datetime().to_rfc3339(),
        }
    }
}

/// All message types that can be received from client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ConversationId;

    #[test]
    fn update_wraps_the_tagged_event() {
        let id = ConversationId::new();
        let msg = ServerMessage::Update {
            event: ChatEvent::ConversationRemoved {
                conversation_id: id,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "chat.update");
        assert_eq!(json["event"]["type"], "conversation_removed");
    }

    #[test]
    fn connected_uses_camel_case() {
        let msg = ServerMessage::Connected(ConnectedMessage {
            conversation_id: "c".into(),
            client_id: "x".into(),
            timestamp: "t".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["conversationId"], "c");
    }

    #[test]
    fn lagged_reports_skipped_count() {
        let json = serde_json::to_value(ServerMessage::Lagged { skipped: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "lagged", "skipped": 4 }));
    }

    #[test]
    fn client_ping_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }
}
