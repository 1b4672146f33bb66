//! Tools offered to the model, and the registry that dispatches them.

mod query_memory;
mod registry;
mod sandbox;
mod web_search;

use std::sync::Arc;

use crate::application::memory::MemorySearch;
use crate::ports::{SandboxBackend, WebSearch};

pub use query_memory::{QueryMemoryArgs, QueryMemoryTool};
pub use registry::{ToolRegistry, TypedTool};
pub use sandbox::{
    CreateSandboxTool, ExecCommandTool, ReadFileTool, TerminateSandboxTool, WriteFileTool,
};
pub use web_search::{ExtractArgs, SearchArgs, TavilyExtractTool, TavilyQnaTool, TavilySearchTool};

/// Registers the memory tool plus each tool family whose back-end is
/// configured, in a fixed order.
pub fn build_registry(
    memory: Arc<MemorySearch>,
    web_search: Option<Arc<dyn WebSearch>>,
    sandbox: Option<Arc<dyn SandboxBackend>>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(QueryMemoryTool::new(memory)));

    if let Some(client) = web_search {
        registry
            .register(Arc::new(TavilySearchTool::new(Arc::clone(&client))))
            .register(Arc::new(TavilyQnaTool::new(Arc::clone(&client))))
            .register(Arc::new(TavilyExtractTool::new(client)));
    }

    if let Some(backend) = sandbox {
        registry
            .register(Arc::new(CreateSandboxTool::new(Arc::clone(&backend))))
            .register(Arc::new(TerminateSandboxTool::new(Arc::clone(&backend))))
            .register(Arc::new(ExecCommandTool::new(Arc::clone(&backend))))
            .register(Arc::new(ReadFileTool::new(Arc::clone(&backend))))
            .register(Arc::new(WriteFileTool::new(backend)));
    }

    registry
}
