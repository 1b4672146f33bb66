//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - OpenAI chat completions and embeddings
//! - `auth` - bearer-token validation
//! - `clerk` - identity-provider user webhook
//! - `http` - REST API and router
//! - `memory` - in-memory stores
//! - `postgres` - sqlx stores
//! - `scheduler` - background task queue
//! - `tools` - web search and sandbox clients
//! - `websocket` - live conversation feed

pub mod ai;
pub mod auth;
pub mod clerk;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod scheduler;
pub mod tools;
pub mod websocket;
