//! WebSocket live feed.
//!
//! ```text
//! ChatStore write ──► NotifyingChatStore ──► RoomManager (ChangeNotifier)
//!                                              │
//!                         ┌────────────────────┼────────────────────┐
//!                         ▼                    ▼                    ▼
//!                 Room: conversation-1  Room: conversation-2       ...
//!                 ├── client-a          └── client-c
//!                 └── client-b
//! ```
//!
//! - [`messages`] - wire protocol types
//! - [`rooms`] - per-conversation broadcast rooms
//! - [`notifying_store`] - store decorator that publishes committed writes
//! - [`handler`] - axum upgrade handler

pub mod handler;
pub mod messages;
pub mod notifying_store;
pub mod rooms;

pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{ClientMessage, ConnectedMessage, ErrorMessage, PongMessage, ServerMessage};
pub use notifying_store::NotifyingChatStore;
pub use rooms::{ClientId, RoomManager};
