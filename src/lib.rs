//! Chat at Home - a self-hosted, tool-calling LLM chat backend.
//!
//! A user message schedules a background chat run. The run streams the
//! model's reply into a placeholder message, executes any tool calls the
//! model makes (memory recall, web search, code sandboxes) and loops until
//! the model answers in text. Connected clients watch the conversation
//! change over a WebSocket.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
