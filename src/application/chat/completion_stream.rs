//! Streaming completion adapter.
//!
//! Wraps one streaming provider call and commits to the turn's shape from
//! the first chunk: a tool call, or a plain message. Either way the caller
//! pulls cumulative snapshots (the full text assembled so far) until the
//! turn ends. Both turn kinds are forward-only and cannot be restarted.
//!
//! ```ignore
//! match stream_turn(provider, request).await? {
//!     Turn::ToolCall(mut turn) => {
//!         while let Some(args) = turn.next_snapshot().await? { /* persist */ }
//!         let call = turn.finish().await?;
//!     }
//!     Turn::Message(mut turn) => {
//!         while let Some(body) = turn.next_snapshot().await? { /* persist */ }
//!     }
//! }
//! ```

use futures::StreamExt;

use super::error::{ChatError, ProtocolViolation};
use crate::ports::{
    ChatChunk, ChatProvider, ChatRequest, ChunkStream, FinishReason, ToolCall, ToolCallDelta,
};

/// Issues one streaming request and classifies the turn.
pub async fn stream_turn(
    provider: &dyn ChatProvider,
    request: ChatRequest,
) -> Result<Turn, ChatError> {
    let chunks = provider.stream_chat(request).await?;
    Turn::from_chunks(chunks).await
}

/// Shape of a streamed turn, decided by its first chunk.
pub enum Turn {
    ToolCall(ToolCallTurn),
    Message(MessageTurn),
}

impl Turn {
    /// Reads the first chunk and commits to a turn kind.
    ///
    /// A tool-call turn is only returned once the tool's name is known;
    /// argument text seen while waiting for it is kept for the first
    /// snapshot.
    pub async fn from_chunks(mut chunks: ChunkStream) -> Result<Self, ChatError> {
        let first = match chunks.next().await {
            None => return Err(ProtocolViolation::EmptyResponse.into()),
            Some(chunk) => chunk?,
        };

        let starts_tool_call = first.tool_calls.as_ref().is_some_and(|d| !d.is_empty());
        if starts_tool_call {
            ToolCallTurn::begin(first, chunks).await.map(Turn::ToolCall)
        } else {
            Ok(Turn::Message(MessageTurn::begin(first, chunks)))
        }
    }
}

/// A turn in which the model calls exactly one tool.
pub struct ToolCallTurn {
    chunks: ChunkStream,
    index: Option<u32>,
    call_id: Option<String>,
    name: String,
    arguments: String,
    pending: bool,
    finished: bool,
}

impl ToolCallTurn {
    async fn begin(first: ChatChunk, chunks: ChunkStream) -> Result<Self, ChatError> {
        let mut turn = Self {
            chunks,
            index: None,
            call_id: None,
            name: String::new(),
            arguments: String::new(),
            pending: false,
            finished: false,
        };
        turn.pending = turn.absorb(first)?;

        // Some providers send the name after the opening fragment.
        while turn.name.is_empty() {
            if turn.finished {
                return Err(ProtocolViolation::MissingToolName.into());
            }
            let chunk = turn.pull().await?;
            let grew = turn.absorb(chunk)?;
            turn.pending |= grew;
        }
        Ok(turn)
    }

    /// Name of the called tool.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider call id, once it has been seen.
    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    /// Argument text assembled so far.
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Next cumulative argument snapshot, or `None` once the provider has
    /// signed off with `tool_calls`.
    pub async fn next_snapshot(&mut self) -> Result<Option<String>, ChatError> {
        if std::mem::take(&mut self.pending) {
            return Ok(Some(self.arguments.clone()));
        }
        while !self.finished {
            let chunk = self.pull().await?;
            if self.absorb(chunk)? {
                return Ok(Some(self.arguments.clone()));
            }
        }
        Ok(None)
    }

    /// Drains any remaining snapshots and returns the completed call.
    pub async fn finish(mut self) -> Result<ToolCall, ChatError> {
        while self.next_snapshot().await?.is_some() {}
        let call_id = self.call_id.ok_or(ProtocolViolation::MissingCallId)?;
        Ok(ToolCall::function(call_id, self.name, self.arguments))
    }

    async fn pull(&mut self) -> Result<ChatChunk, ChatError> {
        match self.chunks.next().await {
            None => Err(ProtocolViolation::ToolCallDidNotFinish.into()),
            Some(chunk) => Ok(chunk?),
        }
    }

    /// Applies one chunk. Returns true if the argument text grew.
    fn absorb(&mut self, chunk: ChatChunk) -> Result<bool, ProtocolViolation> {
        if chunk.has_content() {
            return Err(ProtocolViolation::ContentInToolCall);
        }
        if let Some(reason) = chunk.finish_reason {
            if reason != FinishReason::ToolCalls {
                return Err(ProtocolViolation::UnexpectedFinishReason(reason.to_string()));
            }
            self.finished = true;
            return Ok(false);
        }

        let deltas = chunk.tool_calls.ok_or(ProtocolViolation::MissingToolCall)?;
        match <[ToolCallDelta; 1]>::try_from(deltas) {
            Ok([delta]) => self.apply(delta),
            Err(deltas) if deltas.is_empty() => Err(ProtocolViolation::MissingToolCall),
            Err(_) => Err(ProtocolViolation::MultipleToolCalls),
        }
    }

    fn apply(&mut self, delta: ToolCallDelta) -> Result<bool, ProtocolViolation> {
        match self.index {
            Some(index) if index != delta.index => return Err(ProtocolViolation::MultipleToolCalls),
            _ => self.index = Some(delta.index),
        }
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            match &self.call_id {
                Some(existing) if *existing != id => {
                    return Err(ProtocolViolation::MultipleToolCalls)
                }
                _ => self.call_id = Some(id),
            }
        }
        if let Some(name) = delta.name.filter(|n| !n.is_empty()) {
            self.name = name;
        }
        match delta.arguments.filter(|a| !a.is_empty()) {
            Some(fragment) => {
                self.arguments.push_str(&fragment);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A turn in which the model answers with text.
pub struct MessageTurn {
    chunks: ChunkStream,
    body: String,
    pending: bool,
    yielded: bool,
    ended: bool,
}

impl MessageTurn {
    fn begin(first: ChatChunk, chunks: ChunkStream) -> Self {
        let mut turn = Self {
            chunks,
            body: String::new(),
            pending: false,
            yielded: false,
            ended: false,
        };
        turn.pending = turn.absorb(first);
        turn
    }

    /// Body assembled so far.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Next cumulative body snapshot, or `None` once the stream has ended.
    ///
    /// A turn that produces no text still yields one (empty) snapshot.
    pub async fn next_snapshot(&mut self) -> Result<Option<String>, ChatError> {
        if std::mem::take(&mut self.pending) {
            return Ok(Some(self.snapshot()));
        }
        while !self.ended {
            match self.chunks.next().await {
                Some(chunk) => {
                    if self.absorb(chunk?) {
                        return Ok(Some(self.snapshot()));
                    }
                }
                None => {
                    self.ended = true;
                    if !self.yielded {
                        return Ok(Some(self.snapshot()));
                    }
                }
            }
        }
        Ok(None)
    }

    fn snapshot(&mut self) -> String {
        self.yielded = true;
        self.body.clone()
    }

    fn absorb(&mut self, chunk: ChatChunk) -> bool {
        match chunk.content.filter(|c| !c.is_empty()) {
            Some(text) => {
                self.body.push_str(&text);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::AIError;
    use futures::stream;

    fn chunks(items: Vec<Result<ChatChunk, AIError>>) -> ChunkStream {
        Box::pin(stream::iter(items))
    }

    fn ok(items: Vec<ChatChunk>) -> ChunkStream {
        chunks(items.into_iter().map(Ok).collect())
    }

    async fn drain_message(turn: Turn) -> Result<Vec<String>, ChatError> {
        let Turn::Message(mut turn) = turn else {
            panic!("expected message turn");
        };
        let mut snapshots = Vec::new();
        while let Some(s) = turn.next_snapshot().await? {
            snapshots.push(s);
        }
        Ok(snapshots)
    }

    async fn drain_tool_call(turn: Turn) -> Result<(Vec<String>, ToolCall), ChatError> {
        let Turn::ToolCall(mut turn) = turn else {
            panic!("expected tool call turn");
        };
        let mut snapshots = Vec::new();
        while let Some(s) = turn.next_snapshot().await? {
            snapshots.push(s);
        }
        let call = turn.finish().await?;
        Ok((snapshots, call))
    }

    mod message_turns {
        use super::*;

        #[tokio::test]
        async fn yields_cumulative_bodies() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::content("Hel"),
                ChatChunk::content("lo"),
                ChatChunk::content(" there"),
                ChatChunk::finish(FinishReason::Stop),
            ]))
            .await
            .unwrap();

            let snapshots = drain_message(turn).await.unwrap();
            assert_eq!(snapshots, vec!["Hel", "Hello", "Hello there"]);
        }

        #[tokio::test]
        async fn empty_first_chunk_is_skipped() {
            let turn = Turn::from_chunks(ok(vec![ChatChunk::content(""), ChatChunk::content("Hi")]))
                .await
                .unwrap();
            assert_eq!(drain_message(turn).await.unwrap(), vec!["Hi"]);
        }

        #[tokio::test]
        async fn textless_turn_yields_one_empty_snapshot() {
            let turn = Turn::from_chunks(ok(vec![ChatChunk::finish(FinishReason::Stop)]))
                .await
                .unwrap();
            assert_eq!(drain_message(turn).await.unwrap(), vec![String::new()]);
        }

        #[tokio::test]
        async fn empty_stream_fails() {
            let result = Turn::from_chunks(ok(vec![])).await;
            assert!(matches!(
                result,
                Err(ChatError::Protocol(ProtocolViolation::EmptyResponse))
            ));
        }

        #[tokio::test]
        async fn mid_stream_provider_error_surfaces() {
            let turn = Turn::from_chunks(chunks(vec![
                Ok(ChatChunk::content("Hel")),
                Err(AIError::unavailable("connection reset")),
            ]))
            .await
            .unwrap();
            let err = drain_message(turn).await.unwrap_err();
            assert!(err.is_provider_failure());
        }

        #[tokio::test]
        async fn provider_error_before_first_chunk_surfaces() {
            let result = Turn::from_chunks(chunks(vec![Err(AIError::rate_limited(5))])).await;
            assert!(matches!(result, Err(ChatError::Provider(_))));
        }
    }

    mod tool_call_turns {
        use super::*;

        fn args(text: &str) -> ChatChunk {
            ChatChunk::tool_calls(vec![ToolCallDelta::arguments(text)])
        }

        #[tokio::test]
        async fn yields_cumulative_arguments_and_call() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")]),
                args("{\"query\":"),
                args("\"favorite color\"}"),
                ChatChunk::finish(FinishReason::ToolCalls),
            ]))
            .await
            .unwrap();

            let (snapshots, call) = drain_tool_call(turn).await.unwrap();
            assert_eq!(
                snapshots,
                vec!["{\"query\":", "{\"query\":\"favorite color\"}"]
            );
            assert_eq!(call.id, "call_1");
            assert_eq!(call.function.name, "queryMemory");
            assert_eq!(call.function.arguments, "{\"query\":\"favorite color\"}");
        }

        #[tokio::test]
        async fn name_may_arrive_after_opening_fragment() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta {
                    id: Some("call_1".into()),
                    arguments: Some("{".into()),
                    ..ToolCallDelta::default()
                }]),
                ChatChunk::tool_calls(vec![ToolCallDelta {
                    name: Some("readFile".into()),
                    arguments: Some("}".into()),
                    ..ToolCallDelta::default()
                }]),
                ChatChunk::finish(FinishReason::ToolCalls),
            ]))
            .await
            .unwrap();

            let Turn::ToolCall(turn) = turn else {
                panic!("expected tool call turn");
            };
            assert_eq!(turn.name(), "readFile");
            assert_eq!(turn.arguments(), "{}");
            let call = turn.finish().await.unwrap();
            assert_eq!(call.function.arguments, "{}");
        }

        #[tokio::test]
        async fn two_calls_in_one_chunk_fail() {
            let result = Turn::from_chunks(ok(vec![ChatChunk::tool_calls(vec![
                ToolCallDelta::start("call_1", "queryMemory"),
                ToolCallDelta {
                    index: 1,
                    ..ToolCallDelta::start("call_2", "tavilySearch")
                },
            ])]))
            .await;
            assert!(matches!(
                result,
                Err(ChatError::Protocol(ProtocolViolation::MultipleToolCalls))
            ));
        }

        #[tokio::test]
        async fn second_call_id_in_later_chunk_fails() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")]),
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_2", "queryMemory")]),
            ]))
            .await
            .unwrap();
            let err = drain_tool_call(turn).await.unwrap_err();
            assert_eq!(err, ProtocolViolation::MultipleToolCalls.into());
        }

        #[tokio::test]
        async fn content_during_tool_call_fails() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")]),
                ChatChunk::content("oops"),
            ]))
            .await
            .unwrap();
            let err = drain_tool_call(turn).await.unwrap_err();
            assert_eq!(err, ProtocolViolation::ContentInToolCall.into());
        }

        #[tokio::test]
        async fn wrong_finish_reason_fails() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")]),
                ChatChunk::finish(FinishReason::Length),
            ]))
            .await
            .unwrap();
            let err = drain_tool_call(turn).await.unwrap_err();
            assert_eq!(
                err,
                ProtocolViolation::UnexpectedFinishReason("length".into()).into()
            );
        }

        #[tokio::test]
        async fn chunk_without_tool_call_fails() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")]),
                ChatChunk::default(),
            ]))
            .await
            .unwrap();
            let err = drain_tool_call(turn).await.unwrap_err();
            assert_eq!(err, ProtocolViolation::MissingToolCall.into());
        }

        #[tokio::test]
        async fn unfinished_stream_fails() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")]),
                args("{}"),
            ]))
            .await
            .unwrap();
            let err = drain_tool_call(turn).await.unwrap_err();
            assert_eq!(err, ProtocolViolation::ToolCallDidNotFinish.into());
        }

        #[tokio::test]
        async fn missing_call_id_fails_at_finish() {
            let turn = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta {
                    name: Some("queryMemory".into()),
                    ..ToolCallDelta::default()
                }]),
                args("{}"),
                ChatChunk::finish(FinishReason::ToolCalls),
            ]))
            .await
            .unwrap();
            let err = drain_tool_call(turn).await.unwrap_err();
            assert_eq!(err, ProtocolViolation::MissingCallId.into());
        }

        #[tokio::test]
        async fn sign_off_without_name_fails() {
            let result = Turn::from_chunks(ok(vec![
                ChatChunk::tool_calls(vec![ToolCallDelta {
                    id: Some("call_1".into()),
                    ..ToolCallDelta::default()
                }]),
                ChatChunk::finish(FinishReason::ToolCalls),
            ]))
            .await;
            assert!(matches!(
                result,
                Err(ChatError::Protocol(ProtocolViolation::MissingToolName))
            ));
        }
    }

    mod snapshot_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn final_body_is_concatenation_of_deltas(deltas in prop::collection::vec(".{0,8}", 1..20)) {
                let expected: String = deltas.concat();
                let stream = ok(deltas.iter().map(ChatChunk::content).collect());
                let last = futures::executor::block_on(async {
                    let turn = Turn::from_chunks(stream).await.unwrap();
                    drain_message(turn).await.unwrap().pop()
                });
                prop_assert_eq!(last.unwrap_or_default(), expected);
            }

            #[test]
            fn final_arguments_are_concatenation_of_deltas(deltas in prop::collection::vec(".{0,8}", 0..20)) {
                let expected: String = deltas.concat();
                let mut items = vec![ChatChunk::tool_calls(vec![ToolCallDelta::start("call_1", "queryMemory")])];
                items.extend(deltas.iter().map(|d| ChatChunk::tool_calls(vec![ToolCallDelta::arguments(d.as_str())])));
                items.push(ChatChunk::finish(FinishReason::ToolCalls));
                let call = futures::executor::block_on(async {
                    let turn = Turn::from_chunks(ok(items)).await.unwrap();
                    drain_tool_call(turn).await.unwrap().1
                });
                prop_assert_eq!(call.function.arguments, expected);
            }
        }
    }
}
