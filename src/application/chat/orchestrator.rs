//! Chat orchestrator - the tool-calling loop behind every assistant reply.
//!
//! One run per sent message. Each turn streams a completion; a tool-call
//! turn persists the arguments as they arrive, executes the tool and loops,
//! while a message turn streams the body into the placeholder and completes
//! it. Every write goes through the store's lifecycle checks, so a message
//! canceled mid-run makes the next write fail and the run stops there.

use std::sync::Arc;

use tracing::Instrument;

use super::completion_stream::{stream_turn, MessageTurn, ToolCallTurn, Turn};
use super::context::history_context;
use super::error::ChatError;
use super::titler::ConversationTitler;
use crate::application::tools::ToolRegistry;
use crate::domain::conversation::prompt::APOLOGY;
use crate::domain::foundation::{ConversationId, MessageId, UserId};
use crate::domain::memory::IndexJob;
use crate::ports::{
    BackgroundTask, ChatMessage, ChatProvider, ChatRequest, ChatStore, MemoryStore, StoreError,
    TaskScheduler, ToolExecutionContext,
};

/// Command to run the model for one placeholder message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunChatCommand {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
}

impl RunChatCommand {
    pub fn new(conversation_id: ConversationId, message_id: MessageId) -> Self {
        Self {
            conversation_id,
            message_id,
        }
    }
}

/// How the assistant message reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model produced a final message.
    Completed,
    /// The provider failed and the apology was written instead.
    Apologized,
}

/// Result of a chat run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunChatResult {
    pub outcome: RunOutcome,
    /// Tool calls executed successfully during the run.
    pub tool_calls: usize,
    /// Title written by this run, if any.
    pub title: Option<String>,
}

/// Drives a chat run.
pub struct ChatOrchestrator {
    provider: Arc<dyn ChatProvider>,
    store: Arc<dyn ChatStore>,
    tools: Arc<ToolRegistry>,
    titler: ConversationTitler,
    memory_queue: Option<MemoryQueue>,
}

/// Where completed replies go to become memories.
struct MemoryQueue {
    memories: Arc<dyn MemoryStore>,
    scheduler: Arc<dyn TaskScheduler>,
}

impl ChatOrchestrator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        store: Arc<dyn ChatStore>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let titler = ConversationTitler::new(Arc::clone(&provider), Arc::clone(&store));
        Self {
            provider,
            store,
            tools,
            titler,
            memory_queue: None,
        }
    }

    /// Queues every completed reply for memory indexing.
    pub fn with_memory_queue(
        mut self,
        memories: Arc<dyn MemoryStore>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        self.memory_queue = Some(MemoryQueue {
            memories,
            scheduler,
        });
        self
    }

    /// Runs the loop until the placeholder reaches a terminal state, then
    /// titles the conversation if it is still unnamed.
    ///
    /// # Errors
    ///
    /// Provider-level failures are recovered with the apology. Everything
    /// else (protocol violations, tool failures, lifecycle violations)
    /// propagates and leaves the message in its last written state. A title
    /// failure is returned after the reply has already been persisted.
    pub async fn handle(&self, cmd: RunChatCommand) -> Result<RunChatResult, ChatError> {
        let span = tracing::info_span!(
            "chat_run",
            conversation_id = %cmd.conversation_id,
            message_id = %cmd.message_id,
        );
        self.run(cmd).instrument(span).await
    }

    async fn run(&self, cmd: RunChatCommand) -> Result<RunChatResult, ChatError> {
        let conversation = self
            .store
            .get_conversation(cmd.conversation_id)
            .await?
            .ok_or_else(|| StoreError::conversation_not_found(cmd.conversation_id))?;

        let history = self.store.list_messages(cmd.conversation_id).await?;
        let mut context = vec![ChatMessage::system(self.tools.system_prompt())];
        context.extend(history_context(&history, Some(cmd.message_id)));

        let run = RunState {
            conversation_id: cmd.conversation_id,
            message_id: cmd.message_id,
            user_id: conversation.creator_id().clone(),
        };

        let (outcome, tool_calls) = match self.turn_loop(&run, &mut context).await {
            Ok(tool_calls) => (RunOutcome::Completed, tool_calls),
            Err(err) if err.is_provider_failure() => {
                tracing::error!(error = %err, "Provider failed, writing apology");
                self.store.patch_message_body(run.message_id, APOLOGY).await?;
                self.store.complete_message(run.message_id).await?;
                (RunOutcome::Apologized, 0)
            }
            Err(err) => return Err(err),
        };

        let title = self.titler.title_if_needed(&conversation).await?;

        Ok(RunChatResult {
            outcome,
            tool_calls,
            title,
        })
    }

    async fn turn_loop(
        &self,
        run: &RunState,
        context: &mut Vec<ChatMessage>,
    ) -> Result<usize, ChatError> {
        let tools = self.tools.definitions();
        let mut tool_calls = 0;

        loop {
            tracing::debug!(turn = tool_calls + 1, context_len = context.len(), "Requesting completion");
            let request = ChatRequest::new(context.clone()).with_tools(tools.clone());

            match stream_turn(self.provider.as_ref(), request).await? {
                Turn::ToolCall(turn) => {
                    self.run_tool_call(run, turn, context).await?;
                    tool_calls += 1;
                }
                Turn::Message(turn) => {
                    self.stream_reply(run, turn).await?;
                    return Ok(tool_calls);
                }
            }
        }
    }

    async fn run_tool_call(
        &self,
        run: &RunState,
        mut turn: ToolCallTurn,
        context: &mut Vec<ChatMessage>,
    ) -> Result<(), ChatError> {
        let tool_use = self
            .store
            .start_tool_use(run.message_id, turn.name())
            .await?;

        while let Some(arguments) = turn.next_snapshot().await? {
            self.store
                .set_tool_arguments(tool_use.id(), &arguments)
                .await?;
        }
        let call = turn.finish().await?;
        self.store.set_tool_in_progress(tool_use.id()).await?;
        context.push(ChatMessage::assistant_tool_call(call.clone()));

        tracing::info!(tool = %call.function.name, call_id = %call.id, "Executing tool");
        let exec_context = ToolExecutionContext::new(
            run.message_id,
            run.conversation_id,
            run.user_id.clone(),
            call.id.clone(),
        );

        match self
            .tools
            .execute_tool(&exec_context, &call.function.name, &call.function.arguments)
            .await
        {
            Ok(result) => {
                context.push(ChatMessage::tool_result(&call.id, &result));
                self.store.set_tool_success(tool_use.id(), &result).await?;
                Ok(())
            }
            Err(err) => {
                let description = err.to_string();
                tracing::warn!(tool = %call.function.name, error = %description, "Tool failed");
                context.push(ChatMessage::tool_result(&call.id, &description));
                self.store.set_tool_error(tool_use.id(), &description).await?;
                Err(err.into())
            }
        }
    }

    async fn stream_reply(&self, run: &RunState, mut turn: MessageTurn) -> Result<(), ChatError> {
        while let Some(body) = turn.next_snapshot().await? {
            self.store.patch_message_body(run.message_id, &body).await?;
        }
        self.store.complete_message(run.message_id).await?;

        if let Some(queue) = &self.memory_queue {
            queue
                .memories
                .enqueue(&IndexJob::for_message(run.message_id))
                .await?;
            queue.scheduler.schedule(BackgroundTask::IndexMemories).await?;
        }
        Ok(())
    }
}

struct RunState {
    conversation_id: ConversationId,
    message_id: MessageId,
    user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockChatProvider, ScriptedTurn};
    use crate::adapters::memory::InMemoryChatStore;
    use crate::domain::conversation::{
        Conversation, Message, MessageState, ToolUseStatus, CANCELED_BY_USER,
    };
    use crate::ports::{AIError, Tool, ToolExecutionError};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> crate::domain::conversation::ToolDefinition {
            crate::domain::conversation::ToolDefinition::new(
                "echo",
                "Echo the arguments back.",
                serde_json::json!({"type": "object"}),
            )
        }

        async fn call(
            &self,
            _context: &ToolExecutionContext,
            args: serde_json::Value,
        ) -> Result<serde_json::Value, ToolExecutionError> {
            Ok(args)
        }
    }

    struct Fixture {
        store: Arc<InMemoryChatStore>,
        provider: Arc<MockChatProvider>,
        orchestrator: ChatOrchestrator,
        command: RunChatCommand,
    }

    async fn fixture(name: Option<&str>, turns: Vec<ScriptedTurn>) -> Fixture {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = Arc::new(MockChatProvider::new(turns).with_title("Greeting Exchange"));
        let user = UserId::new("user_1").unwrap();
        let conversation = Conversation::new(user.clone(), name.map(str::to_string));
        store.insert_conversation(&conversation).await.unwrap();
        let question = Message::user(conversation.id(), user, "Hello").unwrap();
        store.insert_message(&question).await.unwrap();
        let placeholder = Message::assistant_placeholder(conversation.id());
        store.insert_message(&placeholder).await.unwrap();

        let registry = ToolRegistry::new().with(Arc::new(Echo));
        let orchestrator = ChatOrchestrator::new(
            provider.clone(),
            store.clone(),
            Arc::new(registry),
        );
        Fixture {
            store,
            provider,
            orchestrator,
            command: RunChatCommand::new(conversation.id(), placeholder.id()),
        }
    }

    #[tokio::test]
    async fn message_turn_completes_placeholder() {
        let f = fixture(Some("Named"), vec![ScriptedTurn::message(["Hi", " there"])]).await;

        let result = f.orchestrator.handle(f.command).await.unwrap();

        assert_eq!(result.outcome, RunOutcome::Completed);
        assert_eq!(result.title, None);
        let message = f.store.get_message(f.command.message_id).await.unwrap().unwrap();
        assert_eq!(message.body(), "Hi there");
        assert_eq!(message.state(), &MessageState::Complete);
    }

    #[tokio::test]
    async fn context_excludes_placeholder() {
        let f = fixture(Some("Named"), vec![ScriptedTurn::message(["Hi"])]).await;
        f.orchestrator.handle(f.command).await.unwrap();

        let requests = f.provider.requests();
        let context = &requests[0].messages;
        assert_eq!(context.len(), 2);
        assert!(matches!(context[0], ChatMessage::System { .. }));
        assert_eq!(context[1], ChatMessage::user("Hello"));
    }

    #[tokio::test]
    async fn tool_call_loops_back_to_provider() {
        let f = fixture(
            Some("Named"),
            vec![
                ScriptedTurn::tool_call("call_1", "echo", ["{\"a\":", "1}"]),
                ScriptedTurn::message(["Done"]),
            ],
        )
        .await;

        let result = f.orchestrator.handle(f.command).await.unwrap();
        assert_eq!(result.tool_calls, 1);

        let tool_uses = f.store.list_tool_uses(f.command.message_id).await.unwrap();
        assert_eq!(tool_uses.len(), 1);
        assert_eq!(tool_uses[0].tool_args(), "{\"a\":1}");
        assert_eq!(
            tool_uses[0].status(),
            &ToolUseStatus::Success {
                result: "{\"a\":1}".into()
            }
        );

        let requests = f.provider.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1].messages;
        assert_eq!(
            second.last(),
            Some(&ChatMessage::tool_result("call_1", "{\"a\":1}"))
        );
    }

    #[tokio::test]
    async fn tool_failure_records_error_and_aborts() {
        let f = fixture(
            Some("Named"),
            vec![ScriptedTurn::tool_call("call_1", "missing", ["{}"])],
        )
        .await;

        let err = f.orchestrator.handle(f.command).await.unwrap_err();
        assert_eq!(err, ToolExecutionError::UnknownTool("missing".into()).into());

        let tool_uses = f.store.list_tool_uses(f.command.message_id).await.unwrap();
        assert_eq!(
            tool_uses[0].status(),
            &ToolUseStatus::Error {
                error: "Unknown tool: missing".into()
            }
        );
        let message = f.store.get_message(f.command.message_id).await.unwrap().unwrap();
        assert!(message.is_generating());
    }

    #[tokio::test]
    async fn provider_outage_writes_apology() {
        let f = fixture(
            Some("Named"),
            vec![ScriptedTurn::fail(AIError::unavailable("503"))],
        )
        .await;

        let result = f.orchestrator.handle(f.command).await.unwrap();

        assert_eq!(result.outcome, RunOutcome::Apologized);
        let message = f.store.get_message(f.command.message_id).await.unwrap().unwrap();
        assert_eq!(message.body(), APOLOGY);
        assert!(!message.is_generating());
    }

    #[tokio::test]
    async fn unnamed_conversation_gets_title() {
        let f = fixture(None, vec![ScriptedTurn::message(["Hi"])]).await;

        let result = f.orchestrator.handle(f.command).await.unwrap();

        assert_eq!(result.title.as_deref(), Some("Greeting Exchange"));
        let conversation = f
            .store
            .get_conversation(f.command.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.name(), Some("Greeting Exchange"));
    }

    #[tokio::test]
    async fn canceled_message_stops_run() {
        let f = fixture(Some("Named"), vec![ScriptedTurn::message(["Hi"])]).await;
        f.store.cancel_message(f.command.message_id).await.unwrap();

        let err = f.orchestrator.handle(f.command).await.unwrap_err();

        assert!(matches!(err, ChatError::Store(StoreError::Lifecycle(_))));
        let message = f.store.get_message(f.command.message_id).await.unwrap().unwrap();
        assert_eq!(message.state().error(), Some(CANCELED_BY_USER));
    }
}
