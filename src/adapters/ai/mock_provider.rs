//! Scripted chat provider and deterministic embedder for testing.
//!
//! Lets tests drive whole chat runs without calling real model APIs.
//!
//! # Features
//!
//! - One scripted turn per streaming call, consumed in order
//! - Raw chunk scripts for protocol-violation tests
//! - Error injection before the stream starts or partway through it
//! - Optional per-chunk delay for cancellation tests
//! - Request tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockChatProvider::new(vec![
//!     ScriptedTurn::tool_call("call_1", "queryMemory", [r#"{"query":"color"}"#]),
//!     ScriptedTurn::message(["Your favorite ", "color is teal."]),
//! ])
//! .with_title("Favorite Color");
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, ChatChunk, ChatProvider, ChatRequest, ChunkStream, Embedder, FinishReason,
    JsonCompletionRequest, ProviderInfo, ToolCallDelta,
};

/// Title returned when a test does not configure one.
pub const DEFAULT_MOCK_TITLE: &str = "Mock Conversation";

/// What one streaming call returns.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Stream these items in order.
    Chunks(Vec<Result<ChatChunk, AIError>>),
    /// Fail before any chunk is produced.
    Fail(AIError),
}

impl ScriptedTurn {
    /// A message turn: one content chunk per part, then `stop`.
    pub fn message<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chunks: Vec<_> = parts
            .into_iter()
            .map(|part| Ok(ChatChunk::content(part)))
            .collect();
        chunks.push(Ok(ChatChunk::finish(FinishReason::Stop)));
        Self::Chunks(chunks)
    }

    /// A single tool call: id and name first, one argument fragment per
    /// part, then `tool_calls`.
    pub fn tool_call<I, S>(id: &str, name: &str, argument_parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chunks = vec![Ok(ChatChunk::tool_calls(vec![ToolCallDelta::start(
            id, name,
        )]))];
        chunks.extend(
            argument_parts
                .into_iter()
                .map(|part| Ok(ChatChunk::tool_calls(vec![ToolCallDelta::arguments(part)]))),
        );
        chunks.push(Ok(ChatChunk::finish(FinishReason::ToolCalls)));
        Self::Chunks(chunks)
    }

    /// Raw chunks, streamed exactly as given.
    pub fn chunks(chunks: Vec<ChatChunk>) -> Self {
        Self::Chunks(chunks.into_iter().map(Ok).collect())
    }

    /// Fails the call itself.
    pub fn fail(error: AIError) -> Self {
        Self::Fail(error)
    }

    /// Streams `chunks`, then yields `error` instead of finishing.
    pub fn fail_after(chunks: Vec<ChatChunk>, error: AIError) -> Self {
        let mut items: Vec<_> = chunks.into_iter().map(Ok).collect();
        items.push(Err(error));
        Self::Chunks(items)
    }
}

/// Chat provider that replays scripted turns.
pub struct MockChatProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    title: Result<serde_json::Value, AIError>,
    chunk_delay: Duration,
    requests: Mutex<Vec<ChatRequest>>,
    json_requests: Mutex<Vec<JsonCompletionRequest>>,
}

impl MockChatProvider {
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            title: Ok(json!({ "title": DEFAULT_MOCK_TITLE })),
            chunk_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            json_requests: Mutex::new(Vec::new()),
        }
    }

    /// Title returned by structured completions.
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.with_title_response(Ok(json!({ "title": title.into() })))
    }

    /// Raw structured-completion result, for malformed-title tests.
    pub fn with_title_response(mut self, response: Result<serde_json::Value, AIError>) -> Self {
        self.title = response;
        self
    }

    /// Sleeps before every streamed chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Appends a turn to the script.
    pub fn push_turn(&self, turn: ScriptedTurn) {
        lock(&self.turns).push_back(turn);
    }

    /// Streaming requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    /// Structured-completion requests received so far.
    pub fn json_requests(&self) -> Vec<JsonCompletionRequest> {
        lock(&self.json_requests).clone()
    }

    /// Turns not yet consumed.
    pub fn remaining_turns(&self) -> usize {
        lock(&self.turns).len()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChunkStream, AIError> {
        lock(&self.requests).push(request);

        let turn = lock(&self.turns)
            .pop_front()
            .ok_or_else(|| AIError::unavailable("mock provider has no scripted turn left"))?;

        match turn {
            ScriptedTurn::Fail(error) => Err(error),
            ScriptedTurn::Chunks(items) => {
                let delay = self.chunk_delay;
                let chunks = stream::iter(items).then(move |item| async move {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    item
                });
                Ok(Box::pin(chunks))
            }
        }
    }

    async fn complete_json(
        &self,
        request: JsonCompletionRequest,
    ) -> Result<serde_json::Value, AIError> {
        lock(&self.json_requests).push(request);
        self.title.clone()
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", "mock-chat-1")
    }
}

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one dimension, so texts that share
/// words score a positive cosine similarity and unrelated texts score
/// (close to) zero.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    failure: Option<AIError>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            failure: None,
        }
    }

    /// Makes every call fail with `error`.
    pub fn failing(mut self, error: AIError) -> Self {
        self.failure = Some(error);
        self
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a, stable across runs and platforms.
        let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, AIError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::cosine_similarity;
    use crate::ports::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("Hello")])
    }

    async fn collect(provider: &MockChatProvider) -> Vec<Result<ChatChunk, AIError>> {
        provider.stream_chat(request()).await.unwrap().collect().await
    }

    mod chat {
        use super::*;

        #[tokio::test]
        async fn message_turn_ends_with_stop() {
            let provider = MockChatProvider::new(vec![ScriptedTurn::message(["Hi", " there"])]);
            let chunks = collect(&provider).await;
            assert_eq!(
                chunks,
                vec![
                    Ok(ChatChunk::content("Hi")),
                    Ok(ChatChunk::content(" there")),
                    Ok(ChatChunk::finish(FinishReason::Stop)),
                ]
            );
        }

        #[tokio::test]
        async fn tool_call_turn_opens_with_id_and_name() {
            let provider =
                MockChatProvider::new(vec![ScriptedTurn::tool_call("call_1", "echo", ["{}"])]);
            let chunks = collect(&provider).await;
            let first = chunks[0].as_ref().unwrap().tool_calls.as_ref().unwrap();
            assert_eq!(first[0].id.as_deref(), Some("call_1"));
            assert_eq!(first[0].name.as_deref(), Some("echo"));
            assert_eq!(
                chunks.last().unwrap(),
                &Ok(ChatChunk::finish(FinishReason::ToolCalls))
            );
        }

        #[tokio::test]
        async fn turns_are_consumed_in_order_then_exhausted() {
            let provider = MockChatProvider::new(vec![
                ScriptedTurn::fail(AIError::rate_limited(1)),
                ScriptedTurn::message(["ok"]),
            ]);
            assert!(matches!(
                provider.stream_chat(request()).await,
                Err(AIError::RateLimited { .. })
            ));
            assert_eq!(provider.remaining_turns(), 1);
            assert_eq!(collect(&provider).await.len(), 2);
            assert!(matches!(
                provider.stream_chat(request()).await,
                Err(AIError::Unavailable { .. })
            ));
            assert_eq!(provider.requests().len(), 3);
        }

        #[tokio::test]
        async fn fail_after_yields_error_in_stream() {
            let provider = MockChatProvider::new(vec![ScriptedTurn::fail_after(
                vec![ChatChunk::content("partial")],
                AIError::network("reset"),
            )]);
            let chunks = collect(&provider).await;
            assert_eq!(chunks[1], Err(AIError::network("reset")));
        }

        #[tokio::test]
        async fn title_defaults_and_is_recorded() {
            let provider = MockChatProvider::new(Vec::new());
            let reply = provider
                .complete_json(JsonCompletionRequest {
                    messages: vec![],
                    schema_name: "title".into(),
                    schema: json!({}),
                })
                .await
                .unwrap();
            assert_eq!(reply["title"], DEFAULT_MOCK_TITLE);
            assert_eq!(provider.json_requests()[0].schema_name, "title");
        }
    }

    mod embedder {
        use super::*;

        #[tokio::test]
        async fn shared_words_score_higher_than_unrelated_text() {
            let embedder = MockEmbedder::default();
            let query = embedder.embed("favorite color").await.unwrap();
            let related = embedder.embed("My favorite color is teal").await.unwrap();
            let unrelated = embedder.embed("The weather in Lisbon was sunny").await.unwrap();

            assert!(
                cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated)
            );
        }

        #[tokio::test]
        async fn embedding_is_case_insensitive_and_sized() {
            let embedder = MockEmbedder::new(32);
            let a = embedder.embed("Teal").await.unwrap();
            let b = embedder.embed("teal!").await.unwrap();
            assert_eq!(a, b);
            assert_eq!(a.len(), 32);
        }

        #[tokio::test]
        async fn failing_embedder_returns_error() {
            let embedder = MockEmbedder::default().failing(AIError::AuthenticationFailed);
            assert_eq!(
                embedder.embed("x").await,
                Err(AIError::AuthenticationFailed)
            );
        }
    }
}
