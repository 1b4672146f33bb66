//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage
//!
//! - `ChatStore` - conversations, messages and tool uses with lifecycle checks
//! - `MemoryStore` - memory indexing queue and per-user vector search
//! - `UserRepository` - synced users and the allowed-emails table
//!
//! ## Model access
//!
//! - `ChatProvider` - streaming chat completions and structured completions
//! - `Embedder` - text embeddings
//!
//! ## Tools
//!
//! - `Tool` - a callable capability exposed to the model
//! - `WebSearch`, `SandboxBackend` - external tool back-ends
//!
//! ## Runtime
//!
//! - `TaskScheduler` - deferred background work
//! - `ChangeNotifier` - live updates to subscribed clients
//! - `SessionValidator` - bearer-token validation

mod ai_provider;
mod change_notifier;
mod chat_store;
mod embedder;
mod memory_store;
mod sandbox;
mod session_validator;
mod task_scheduler;
mod tool_executor;
mod user_repository;
mod web_search;

pub use ai_provider::{
    AIError, ChatChunk, ChatMessage, ChatProvider, ChatRequest, ChunkStream, FinishReason,
    FunctionCall, JsonCompletionRequest, ProviderInfo, ToolCall, ToolCallDelta,
};
pub use change_notifier::{ChangeNotifier, ChatEvent};
pub use chat_store::{ChatStore, StoreError};
pub use embedder::Embedder;
pub use memory_store::MemoryStore;
pub use sandbox::{
    CreateSandboxArgs, CreateSandboxResponse, ExecCommandArgs, ExecCommandResponse,
    ReadFileArgs, ReadFileResponse, SandboxBackend, StatusResponse, TerminateSandboxArgs,
    WriteFileArgs,
};
pub use session_validator::SessionValidator;
pub use task_scheduler::{BackgroundTask, SchedulerError, TaskScheduler};
pub use tool_executor::{Tool, ToolExecutionContext, ToolExecutionError};
pub use user_repository::UserRepository;
pub use web_search::{BackendError, SearchDepth, SearchOptions, SearchTopic, WebSearch};
