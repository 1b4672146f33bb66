//! `queryMemory` - semantic search over the caller's memories.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;

use super::registry::TypedTool;
use crate::application::memory::MemorySearch;
use crate::domain::conversation::ToolDefinition;
use crate::domain::memory::MemoryMatch;
use crate::ports::{ToolExecutionContext, ToolExecutionError};

const DESCRIPTION: &str = "Issue a semantic search query over all previous memories. The query string will be embedded, and the query will return the content of the 15 memories closest in embedding space.";

const PROMPT: &str = "This chat app supports memories, where you can query memories using OpenAI's embedding
model and a nearest neighbor search. Use the \"queryMemory\" tool to search for memories
if you believe it will help the conversation. Be aware that the memories may not
be that relevant to the conversation.";

static PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": { "query": { "type": "string" } },
        "required": ["query"],
        "additionalProperties": false
    })
});

static RETURNS: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "_score": { "type": "number" },
                "ageMilliseconds": { "type": "number" },
                "body": { "type": "string" },
                "name": { "type": "string" }
            },
            "required": ["_score", "ageMilliseconds", "body", "name"]
        }
    })
});

#[derive(Debug, Deserialize)]
pub struct QueryMemoryArgs {
    pub query: String,
}

/// Searches the memories of the conversation's creator.
pub struct QueryMemoryTool {
    search: Arc<MemorySearch>,
}

impl QueryMemoryTool {
    pub fn new(search: Arc<MemorySearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl TypedTool for QueryMemoryTool {
    type Args = QueryMemoryArgs;
    type Output = Vec<MemoryMatch>;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition::new("queryMemory", DESCRIPTION, PARAMETERS.clone())
            .with_returns(RETURNS.clone())
            .with_prompt(PROMPT)
    }

    async fn run(
        &self,
        context: &ToolExecutionContext,
        args: QueryMemoryArgs,
    ) -> Result<Vec<MemoryMatch>, ToolExecutionError> {
        self.search
            .query(&context.user_id, &args.query)
            .await
            .map_err(|e| ToolExecutionError::execution_failed(e.to_string()))
    }
}
