//! Application layer - the chat run, tools, memory and request handlers.
//!
//! - `chat` - the orchestrator, streaming completion adapter and titler
//! - `tools` - tool registry/dispatcher and the concrete tools
//! - `memory` - memory indexing and search
//! - `handlers` - command and query handlers for the API and worker

pub mod chat;
pub mod handlers;
pub mod memory;
pub mod tools;
