//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, errors and the state machine trait that the
//! chat domain is built from.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{ConversationId, IndexJobId, MemoryId, MessageId, ToolUseId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
