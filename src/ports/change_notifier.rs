//! Change notifier port - pushes committed writes to live subscribers.
//!
//! Published after each store write commits, so subscribers see every
//! streaming snapshot in order.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{Conversation, Message, ToolUse};
use crate::domain::foundation::ConversationId;

/// A committed change, scoped to one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ConversationUpdated {
        conversation: Conversation,
    },
    ConversationRemoved {
        conversation_id: ConversationId,
    },
    MessageUpserted {
        message: Message,
    },
    ToolUseUpserted {
        conversation_id: ConversationId,
        tool_use: ToolUse,
    },
}

impl ChatEvent {
    /// Conversation whose subscribers receive the event.
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            ChatEvent::ConversationUpdated { conversation } => conversation.id(),
            ChatEvent::ConversationRemoved { conversation_id }
            | ChatEvent::ToolUseUpserted {
                conversation_id, ..
            } => *conversation_id,
            ChatEvent::MessageUpserted { message } => message.conversation_id(),
        }
    }
}

/// Fire-and-forget publisher. Having no subscribers is not an error.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: ChatEvent);
}
