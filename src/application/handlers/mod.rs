//! Application handlers.
//!
//! Command and query handlers behind the HTTP API, plus the handler the
//! background worker dispatches scheduled tasks to.

pub mod background;
pub mod conversation;
pub mod message;
pub mod user;

pub use background::{BackgroundTaskError, BackgroundTaskHandler};
pub use conversation::{
    ConversationError, CreateConversationCommand, CreateConversationHandler,
    GetConversationHandler, GetConversationQuery, ListConversationsHandler,
    ListConversationsQuery, RemoveConversationCommand, RemoveConversationHandler,
    RemoveConversationResult, RenameConversationCommand, RenameConversationHandler,
};
pub use message::{
    AuthorView, CancelMessageCommand, CancelMessageHandler, ListMessagesHandler,
    ListMessagesQuery, MessageView, SendMessageCommand, SendMessageHandler, SendMessageResult,
};
pub use user::{AccessError, SyncUserCommand, SyncUserHandler, SyncUserResult, UserAccessHandler};
