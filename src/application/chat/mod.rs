//! Chat runs: the streaming adapter, the tool-calling loop and titling.

mod completion_stream;
mod context;
mod error;
mod orchestrator;
mod titler;

pub use completion_stream::{stream_turn, MessageTurn, ToolCallTurn, Turn};
pub use context::history_context;
pub use error::{ChatError, ProtocolViolation};
pub use orchestrator::{ChatOrchestrator, RunChatCommand, RunChatResult, RunOutcome};
pub use titler::ConversationTitler;
