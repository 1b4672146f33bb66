//! OpenAI Provider - chat completions, structured completions and
//! embeddings over OpenAI's HTTP API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_chat_model("gpt-4o")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Streaming
//!
//! Chat turns stream as Server-Sent Events. Network reads do not line up
//! with event boundaries, so the byte stream goes through [`SseDecoder`],
//! which buffers partial lines and yields one [`ChatChunk`] per `data:`
//! event until the `[DONE]` marker.

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, ChatChunk, ChatProvider, ChatRequest, ChunkStream, Embedder,
    FinishReason, JsonCompletionRequest, ProviderInfo, ToolCallDelta,
};

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    /// Model used for chat turns and titles.
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub base_url: String,
    pub timeout: Duration,
    /// Retries for failures before the first byte of a response.
    pub max_retries: u32,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimensions = dimensions;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API client implementing both [`ChatProvider`] and [`Embedder`].
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    fn chat_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = json!({
            "model": self.config.chat_model,
            "messages": request.messages,
            "stream": true,
        });
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| tool.to_openai_format())
                .collect();
        }
        body
    }

    fn json_body(&self, request: &JsonCompletionRequest) -> serde_json::Value {
        json!({
            "model": self.config.chat_model,
            "messages": request.messages,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema,
                    "strict": true,
                }
            }
        })
    }

    /// Posts a JSON body, retrying transient failures with exponential
    /// backoff. Only the request itself is retried; a stream that fails
    /// midway is reported as-is.
    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response, AIError> {
        let mut attempt = 0;
        loop {
            let result = match self.send(path, body).await {
                Ok(response) => Self::check_status(response).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = match &err {
                        AIError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(u64::from(*retry_after_secs))
                        }
                        _ => Duration::from_secs(1 << attempt),
                    };
                    tracing::warn!(path, attempt, error = %err, "OpenAI request failed, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send(&self, path: &str, body: &serde_json::Value) -> Result<Response, AIError> {
        self.client
            .post(self.url(path))
            .bearer_auth(self.config.api_key())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }

    async fn check_status(response: Response) -> Result<Response, AIError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => AIError::AuthenticationFailed,
            429 => AIError::rate_limited(parse_retry_after(&error_body)),
            400 if error_body.contains("context_length_exceeded")
                || error_body.contains("maximum context length") =>
            {
                AIError::ContextTooLong(error_body)
            }
            400 | 404 | 422 => AIError::InvalidRequest(error_body),
            500..=599 => AIError::unavailable(format!("Server error {}: {}", status, error_body)),
            _ => AIError::network(format!("Unexpected status {}: {}", status, error_body)),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream, AIError> {
        let response = self
            .post("chat/completions", &self.chat_body(&request))
            .await?;

        let chunks = response
            .bytes_stream()
            .scan(SseDecoder::default(), |decoder, bytes| {
                let parsed = match bytes {
                    Ok(bytes) => decoder.push(&bytes),
                    Err(e) => vec![Err(AIError::network(format!("Stream error: {}", e)))],
                };
                future::ready(Some(parsed))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(chunks))
    }

    async fn complete_json(
        &self,
        request: JsonCompletionRequest,
    ) -> Result<serde_json::Value, AIError> {
        let response = self
            .post("chat/completions", &self.json_body(&request))
            .await?;
        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::parse("No choices in response"))?;
        if let Some(refusal) = choice.message.refusal {
            return Err(AIError::content_filtered(refusal));
        }
        let content = choice
            .message
            .content
            .ok_or_else(|| AIError::parse("Response has no content"))?;
        serde_json::from_str(&content)
            .map_err(|e| AIError::parse(format!("Response is not valid JSON: {}", e)))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.chat_model)
    }
}

#[async_trait]
impl Embedder for OpenAIProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, AIError> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": text,
            "dimensions": self.config.embedding_dimensions,
        });
        let response = self.post("embeddings", &body).await?;
        let embeddings: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse embeddings: {}", e)))?;

        let embedding = embeddings
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AIError::parse("No embedding in response"))?;
        if embedding.len() != self.config.embedding_dimensions {
            return Err(AIError::parse(format!(
                "Expected {} dimensions, got {}",
                self.config.embedding_dimensions,
                embedding.len()
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }
}

/// Parses a retry hint like "try again in 20s" from an error body.
fn parse_retry_after(error_body: &str) -> u32 {
    let message = serde_json::from_str::<serde_json::Value>(error_body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string));
    message
        .as_deref()
        .and_then(|s| s.split("try again in ").nth(1))
        .and_then(|rest| {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .unwrap_or(30)
}

/// Incremental decoder from SSE bytes to chunks.
///
/// Bytes are buffered until a full line arrives, so a multi-byte character
/// split across reads is decoded whole.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feeds raw bytes; returns the chunks of every line completed by them.
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<ChatChunk, AIError>> {
        self.buffer.extend_from_slice(bytes);

        let mut results = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line,
                Err(e) => {
                    results.push(Err(AIError::parse(format!(
                        "Invalid UTF-8 in SSE line: {}",
                        e
                    ))));
                    continue;
                }
            };
            let line = line.trim_end_matches(&['\n', '\r'][..]);
            if let Some(data) = line.strip_prefix("data:") {
                if let Some(parsed) = parse_data(data.trim_start()) {
                    results.push(parsed);
                }
            }
        }
        results
    }
}

/// Parses one `data:` payload. `None` for payloads that carry nothing for
/// the first choice.
fn parse_data(data: &str) -> Option<Result<ChatChunk, AIError>> {
    if data == "[DONE]" || data.is_empty() {
        return None;
    }

    let chunk = match serde_json::from_str::<StreamResponseChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(AIError::parse(format!(
                "Failed to parse SSE chunk: {}",
                e
            ))))
        }
    };
    let choice = chunk.choices.into_iter().next()?;

    Some(Ok(ChatChunk {
        content: choice.delta.content,
        tool_calls: choice.delta.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|call| {
                    let function = call.function.unwrap_or_default();
                    ToolCallDelta {
                        index: call.index,
                        id: call.id,
                        name: function.name,
                        arguments: function.arguments,
                    }
                })
                .collect()
        }),
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
    }))
}

// ----- OpenAI API Types -----

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamResponseChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ToolDefinition;
    use crate::ports::ChatMessage;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig::new("test-key").with_base_url("http://localhost/v1/"))
            .unwrap()
    }

    mod config {
        use super::*;

        #[test]
        fn builder_sets_fields() {
            let config = OpenAIConfig::new("test-key")
                .with_chat_model("gpt-4o-mini")
                .with_embedding_model("text-embedding-3-large", 3072)
                .with_timeout(Duration::from_secs(30))
                .with_max_retries(5);

            assert_eq!(config.chat_model, "gpt-4o-mini");
            assert_eq!(config.embedding_model, "text-embedding-3-large");
            assert_eq!(config.embedding_dimensions, 3072);
            assert_eq!(config.timeout, Duration::from_secs(30));
            assert_eq!(config.max_retries, 5);
            assert_eq!(config.api_key(), "test-key");
        }

        #[test]
        fn base_url_drops_trailing_slash() {
            assert_eq!(provider().url("embeddings"), "http://localhost/v1/embeddings");
        }
    }

    mod request_bodies {
        use super::*;

        #[test]
        fn chat_body_streams_and_lists_tools() {
            let request = ChatRequest::new(vec![
                ChatMessage::system("Be helpful"),
                ChatMessage::user("Hi"),
            ])
            .with_tools(vec![ToolDefinition::new(
                "queryMemory",
                "Search memories",
                json!({"type": "object"}),
            )]);

            let body = provider().chat_body(&request);
            assert_eq!(body["model"], "gpt-4o");
            assert_eq!(body["stream"], true);
            assert_eq!(body["messages"][1], json!({"role": "user", "content": "Hi"}));
            assert_eq!(body["tools"][0]["function"]["name"], "queryMemory");
        }

        #[test]
        fn chat_body_omits_empty_tool_list() {
            let body = provider().chat_body(&ChatRequest::new(vec![ChatMessage::user("Hi")]));
            assert!(body.get("tools").is_none());
        }

        #[test]
        fn json_body_uses_strict_schema_format() {
            let body = provider().json_body(&JsonCompletionRequest {
                messages: vec![ChatMessage::user("Hi")],
                schema_name: "title".into(),
                schema: json!({"type": "object"}),
            });
            assert_eq!(body["response_format"]["type"], "json_schema");
            assert_eq!(body["response_format"]["json_schema"]["name"], "title");
            assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        }
    }

    mod sse {
        use super::*;

        #[test]
        fn content_chunk() {
            let mut decoder = SseDecoder::default();
            let chunks = decoder.push(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n\n",
            );
            assert_eq!(chunks, vec![Ok(ChatChunk::content("Hello"))]);
        }

        #[test]
        fn tool_call_fragments_keep_index_id_and_name() {
            let mut decoder = SseDecoder::default();
            let chunks = decoder.push(
                br#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"queryMemory","arguments":""}}]},"finish_reason":null}]}
"#,
            );
            let chunk = chunks[0].as_ref().unwrap();
            let delta = &chunk.tool_calls.as_ref().unwrap()[0];
            assert_eq!(delta.index, 0);
            assert_eq!(delta.id.as_deref(), Some("call_1"));
            assert_eq!(delta.name.as_deref(), Some("queryMemory"));
            assert_eq!(delta.arguments.as_deref(), Some(""));
        }

        #[test]
        fn line_split_across_reads_is_buffered() {
            let mut decoder = SseDecoder::default();
            assert!(decoder
                .push(b"data: {\"choices\":[{\"delta\":{\"con")
                .is_empty());
            let chunks = decoder.push(b"tent\":\"lo\"},\"finish_reason\":null}]}\r\n");
            assert_eq!(chunks, vec![Ok(ChatChunk::content("lo"))]);
        }

        #[test]
        fn character_split_across_reads_is_decoded_whole() {
            let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9} \u{1F600}\"},\"finish_reason\":null}]}\n";
            let bytes = line.as_bytes();
            let emoji_start = line.find('\u{1F600}').unwrap();
            let (first, second) = bytes.split_at(emoji_start + 2);

            let mut decoder = SseDecoder::default();
            assert!(decoder.push(first).is_empty());
            let chunks = decoder.push(second);
            assert_eq!(chunks, vec![Ok(ChatChunk::content("caf\u{e9} \u{1F600}"))]);
        }

        #[test]
        fn invalid_utf8_line_is_a_parse_error() {
            let mut decoder = SseDecoder::default();
            let chunks = decoder.push(b"data: \xff\xfe\n");
            assert!(matches!(chunks[0], Err(AIError::Parse(_))));
        }

        #[test]
        fn finish_reason_and_done_marker() {
            let mut decoder = SseDecoder::default();
            let chunks = decoder.push(
                b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\ndata: [DONE]\n\n",
            );
            assert_eq!(chunks, vec![Ok(ChatChunk::finish(FinishReason::ToolCalls))]);
        }

        #[test]
        fn usage_only_chunk_is_skipped() {
            let mut decoder = SseDecoder::default();
            let chunks = decoder.push(b"data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3}}\n");
            assert!(chunks.is_empty());
        }

        #[test]
        fn garbage_is_a_parse_error() {
            let mut decoder = SseDecoder::default();
            let chunks = decoder.push(b"data: {not json}\n");
            assert!(matches!(chunks[0], Err(AIError::Parse(_))));
        }
    }

    mod retry_after {
        use super::*;

        #[test]
        fn parsed_from_message() {
            let error = r#"{"error":{"message":"Rate limit reached. Please try again in 20s."}}"#;
            assert_eq!(parse_retry_after(error), 20);
        }

        #[test]
        fn defaults_when_absent() {
            assert_eq!(parse_retry_after(r#"{"error":{"message":"busy"}}"#), 30);
            assert_eq!(parse_retry_after("not json"), 30);
        }
    }

    #[test]
    fn provider_info_reports_chat_model() {
        let info = provider().provider_info();
        assert_eq!(info, ProviderInfo::new("openai", "gpt-4o"));
        assert_eq!(provider().dimensions(), 1536);
    }
}
