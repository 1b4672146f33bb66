//! Builds model context from stored conversation history.

use crate::domain::conversation::{Agent, Message};
use crate::domain::foundation::MessageId;
use crate::ports::ChatMessage;

/// Maps stored messages, in creation order, to role-tagged context turns.
///
/// `exclude` drops the placeholder the current run is writing into.
pub fn history_context(messages: &[Message], exclude: Option<MessageId>) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| Some(m.id()) != exclude)
        .map(|m| match m.agent() {
            Agent::User { .. } => ChatMessage::user(m.body()),
            Agent::Assistant => ChatMessage::assistant(m.body()),
        })
        .collect()
}
