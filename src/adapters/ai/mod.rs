//! AI Provider Adapters.
//!
//! Implementations of the `ChatProvider` and `Embedder` ports.
//!
//! ## Available Adapters
//!
//! - `OpenAIProvider` - OpenAI chat completions (SSE streaming, tool calls,
//!   structured output) and embeddings
//! - `MockChatProvider` - Scripted turns for testing
//! - `MockEmbedder` - Deterministic bag-of-words embeddings for testing

mod mock_provider;
mod openai_provider;

pub use mock_provider::{MockChatProvider, MockEmbedder, ScriptedTurn, DEFAULT_MOCK_TITLE};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
