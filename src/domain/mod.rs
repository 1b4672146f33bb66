//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, errors, state machine)
//! - `conversation` - Conversations, messages, tool uses and prompts
//! - `memory` - Embedded long-term memories and their indexing queue
//! - `user` - Synced user records and the email allow-list

pub mod conversation;
pub mod foundation;
pub mod memory;
pub mod user;
