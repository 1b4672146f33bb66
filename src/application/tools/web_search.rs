//! Web search tools: `tavilySearch`, `tavilyQna` and `tavilyExtract`.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;

use super::registry::TypedTool;
use crate::domain::conversation::ToolDefinition;
use crate::ports::{
    BackendError, SearchOptions, ToolExecutionContext, ToolExecutionError, WebSearch,
};

const PROMPT: &str = "You have access to the Tavily API with a few tools:
- Use \"tavilySearch\" to search the web for a particular search term
- Use \"tavilyQna\" to ask the web a particular question
- Use \"tavilyExtract\" to extract content from a list of URLs
Only use these tools if you believe that they will help the conversation.";

static OPTIONS_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "searchDepth": { "type": "string", "enum": ["basic", "advanced"] },
            "topic": { "type": "string", "enum": ["general", "news", "finance"] },
            "days": { "type": "number" },
            "maxResults": { "type": "number" },
            "includeImages": { "type": "boolean" },
            "includeImageDescriptions": { "type": "boolean" },
            "includeAnswer": { "type": "boolean" },
            "includeRawContent": { "type": "boolean" }
        },
        "additionalProperties": false
    })
});

static QUERY_PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string" },
            "options": OPTIONS_SCHEMA.clone()
        },
        "required": ["query"],
        "additionalProperties": false
    })
});

static EXTRACT_PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "urls": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["urls"],
        "additionalProperties": false
    })
});

#[derive(Debug, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub options: SearchOptions,
}

#[derive(Debug, Deserialize)]
pub struct ExtractArgs {
    pub urls: Vec<String>,
}

fn failed(err: BackendError) -> ToolExecutionError {
    ToolExecutionError::execution_failed(err.to_string())
}

/// Searches the web for a term.
pub struct TavilySearchTool {
    client: Arc<dyn WebSearch>,
}

impl TavilySearchTool {
    pub fn new(client: Arc<dyn WebSearch>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TypedTool for TavilySearchTool {
    type Args = SearchArgs;
    type Output = serde_json::Value;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition::new(
            "tavilySearch",
            "Search the web for a particular search term.",
            QUERY_PARAMETERS.clone(),
        )
        .with_prompt(PROMPT)
    }

    async fn run(
        &self,
        _context: &ToolExecutionContext,
        args: SearchArgs,
    ) -> Result<serde_json::Value, ToolExecutionError> {
        self.client
            .search(&args.query, &args.options)
            .await
            .map_err(failed)
    }
}

/// Asks the web a question; returns the answer text.
pub struct TavilyQnaTool {
    client: Arc<dyn WebSearch>,
}

impl TavilyQnaTool {
    pub fn new(client: Arc<dyn WebSearch>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TypedTool for TavilyQnaTool {
    type Args = SearchArgs;
    type Output = String;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition::new(
            "tavilyQna",
            "Ask the web a particular question.",
            QUERY_PARAMETERS.clone(),
        )
        .with_returns(json!({ "type": "string" }))
    }

    async fn run(
        &self,
        _context: &ToolExecutionContext,
        args: SearchArgs,
    ) -> Result<String, ToolExecutionError> {
        self.client
            .answer(&args.query, &args.options)
            .await
            .map_err(failed)
    }
}

/// Extracts page content from a list of URLs.
pub struct TavilyExtractTool {
    client: Arc<dyn WebSearch>,
}

impl TavilyExtractTool {
    pub fn new(client: Arc<dyn WebSearch>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TypedTool for TavilyExtractTool {
    type Args = ExtractArgs;
    type Output = serde_json::Value;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition::new(
            "tavilyExtract",
            "Extract content from a list of URLs.",
            EXTRACT_PARAMETERS.clone(),
        )
    }

    async fn run(
        &self,
        _context: &ToolExecutionContext,
        args: ExtractArgs,
    ) -> Result<serde_json::Value, ToolExecutionError> {
        self.client.extract(&args.urls).await.map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tools::ToolRegistry;
    use crate::domain::foundation::{ConversationId, MessageId, UserId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSearch {
        seen: Mutex<Vec<SearchOptions>>,
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(
            &self,
            query: &str,
            options: &SearchOptions,
        ) -> Result<serde_json::Value, BackendError> {
            self.seen.lock().unwrap().push(options.clone());
            Ok(json!({ "query": query, "results": [] }))
        }

        async fn answer(&self, query: &str, _options: &SearchOptions) -> Result<String, BackendError> {
            Ok(format!("answer to {query}"))
        }

        async fn extract(&self, _urls: &[String]) -> Result<serde_json::Value, BackendError> {
            Err(BackendError::status("extract", "500 Internal Server Error"))
        }
    }

    fn registry(client: Arc<FakeSearch>) -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(TavilySearchTool::new(client.clone())))
            .with(Arc::new(TavilyQnaTool::new(client.clone())))
            .with(Arc::new(TavilyExtractTool::new(client)))
    }

    fn context() -> ToolExecutionContext {
        ToolExecutionContext::new(
            MessageId::new(),
            ConversationId::new(),
            UserId::new("user_1").unwrap(),
            "call_1",
        )
    }

    #[tokio::test]
    async fn search_without_options_uses_defaults() {
        let client = Arc::new(FakeSearch::default());
        let text = registry(client.clone())
            .execute_tool(&context(), "tavilySearch", r#"{"query":"rust"}"#)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["query"], "rust");
        assert_eq!(client.seen.lock().unwrap()[0], SearchOptions::default());
    }

    #[tokio::test]
    async fn qna_result_is_a_json_string() {
        let text = registry(Arc::new(FakeSearch::default()))
            .execute_tool(&context(), "tavilyQna", r#"{"query":"why"}"#)
            .await
            .unwrap();
        assert_eq!(text, "\"answer to why\"");
    }

    #[tokio::test]
    async fn extract_failure_is_reported() {
        let err = registry(Arc::new(FakeSearch::default()))
            .execute_tool(&context(), "tavilyExtract", r#"{"urls":["https://example.com"]}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolExecutionError::ExecutionFailed(_)));
    }

    #[test]
    fn only_search_carries_the_prompt() {
        let reg = registry(Arc::new(FakeSearch::default()));
        assert_eq!(reg.tool_prompts(), PROMPT);
    }
}
