//! Message command and query handlers.
//!
//! These share `ConversationError` with the conversation handlers since
//! every message operation is authorized through its conversation.

mod cancel_message;
mod list_messages;
mod send_message;

pub use cancel_message::{CancelMessageCommand, CancelMessageHandler};
pub use list_messages::{AuthorView, ListMessagesHandler, ListMessagesQuery, MessageView};
pub use send_message::{SendMessageCommand, SendMessageHandler, SendMessageResult};
