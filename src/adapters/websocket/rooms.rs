//! Per-conversation broadcast rooms.
//!
//! ```text
//! Room: conversation-123    Room: conversation-456
//! ├── client-a              ├── client-d
//! └── client-b              └── client-e
//! ```
//!
//! A change in conversation-123 reaches clients a and b only. Publishing is
//! synchronous so store writes can notify without awaiting.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::adapters::memory::{read, write};
use crate::domain::foundation::ConversationId;
use crate::ports::{ChangeNotifier, ChatEvent};

/// Server-side identifier for one socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rooms keyed by conversation.
///
/// Streaming writes publish one snapshot per chunk, so a client that
/// cannot keep up with `channel_capacity` updates is told it lagged.
pub struct RoomManager {
    rooms: RwLock<HashMap<ConversationId, broadcast::Sender<ChatEvent>>>,
    /// client → conversation, for cleanup on disconnect.
    clients: RwLock<HashMap<ClientId, ConversationId>>,
    channel_capacity: usize,
}

impl RoomManager {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    /// Joins `client_id` to the conversation's room, creating it if needed.
    pub fn join(
        &self,
        conversation_id: ConversationId,
        client_id: ClientId,
    ) -> broadcast::Receiver<ChatEvent> {
        let receiver = write(&self.rooms)
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .subscribe();
        write(&self.clients).insert(client_id, conversation_id);
        receiver
    }

    /// Removes a client; drops the room once nobody listens.
    ///
    /// Call after the client's receiver has been dropped.
    pub fn leave(&self, client_id: &ClientId) {
        let Some(conversation_id) = write(&self.clients).remove(client_id) else {
            return;
        };
        let mut rooms = write(&self.rooms);
        if rooms
            .get(&conversation_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            rooms.remove(&conversation_id);
        }
    }

    /// Sends to everyone in the event's room. No room, no-op.
    pub fn broadcast(&self, event: ChatEvent) {
        let conversation_id = event.conversation_id();
        if let Some(sender) = read(&self.rooms).get(&conversation_id) {
            // Err only means every receiver is gone.
            let _ = sender.send(event);
        }
    }

    pub fn client_count(&self, conversation_id: ConversationId) -> usize {
        read(&self.rooms)
            .get(&conversation_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    pub fn active_rooms(&self) -> Vec<ConversationId> {
        read(&self.rooms).keys().copied().collect()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl ChangeNotifier for RoomManager {
    fn publish(&self, event: ChatEvent) {
        self.broadcast(event);
    }
}
