//! Sandbox tools: create, terminate, exec, read and write.
//!
//! Argument and result types are the sandbox port's own request and
//! response shapes, so what the model sends is exactly what the back-end
//! receives.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::json;

use super::registry::TypedTool;
use crate::domain::conversation::ToolDefinition;
use crate::ports::{
    BackendError, CreateSandboxArgs, CreateSandboxResponse, ExecCommandArgs, ExecCommandResponse,
    ReadFileArgs, ReadFileResponse, SandboxBackend, StatusResponse, TerminateSandboxArgs,
    ToolExecutionContext, ToolExecutionError, WriteFileArgs,
};

const PROMPT: &str = "You have access to Modal sandboxes, where you can create a container, optionally with
a custom container image with apt packages or Python pip packages. You can then execute
commands in the sandbox, read and write files, and terminate the sandbox. The sandboxes
do not have network access and terminate after 10 minutes of inactivity. If you ever need
to run code, I would recommend creating a container, writing the code to \"/tmp/code.py\",
and then executing the code with the \"execCommand\" tool. Note that you can reuse containers
across multiple messages if it hasn't been terminated, and files will persist across
messages. This can be a lot more efficient than creating a new container for each message.";

fn string_list() -> serde_json::Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn object(properties: serde_json::Value, required: &[&str]) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

static CREATE_PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    object(
        json!({ "apt_packages": string_list(), "pip_packages": string_list() }),
        &[],
    )
});

static SANDBOX_ID_PARAMETERS: Lazy<serde_json::Value> =
    Lazy::new(|| object(json!({ "sandbox_id": { "type": "string" } }), &["sandbox_id"]));

static EXEC_PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    object(
        json!({ "sandbox_id": { "type": "string" }, "command": string_list() }),
        &["sandbox_id", "command"],
    )
});

static READ_PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    object(
        json!({ "sandbox_id": { "type": "string" }, "path": { "type": "string" } }),
        &["sandbox_id", "path"],
    )
});

static WRITE_PARAMETERS: Lazy<serde_json::Value> = Lazy::new(|| {
    object(
        json!({
            "sandbox_id": { "type": "string" },
            "path": { "type": "string" },
            "contents": { "type": "string" }
        }),
        &["sandbox_id", "path", "contents"],
    )
});

static STATUS_RETURNS: Lazy<serde_json::Value> =
    Lazy::new(|| object(json!({ "status": { "type": "string" } }), &["status"]));

fn failed(err: BackendError) -> ToolExecutionError {
    ToolExecutionError::execution_failed(err.to_string())
}

/// Declares a sandbox tool that forwards its typed arguments to one
/// back-end call.
macro_rules! sandbox_tool {
    (
        $(#[$meta:meta])*
        $tool:ident, $name:literal, $description:literal,
        $args:ty => $output:ty, $method:ident,
        parameters: $parameters:expr,
        returns: $returns:expr
        $(, prompt: $prompt:expr)?
    ) => {
        $(#[$meta])*
        pub struct $tool {
            backend: Arc<dyn SandboxBackend>,
        }

        impl $tool {
            pub fn new(backend: Arc<dyn SandboxBackend>) -> Self {
                Self { backend }
            }
        }

        #[async_trait]
        impl TypedTool for $tool {
            type Args = $args;
            type Output = $output;

            fn describe(&self) -> ToolDefinition {
                ToolDefinition::new($name, $description, $parameters.clone())
                    .with_returns($returns)
                    $(.with_prompt($prompt))?
            }

            async fn run(
                &self,
                _context: &ToolExecutionContext,
                args: $args,
            ) -> Result<$output, ToolExecutionError> {
                self.backend.$method(args).await.map_err(failed)
            }
        }
    };
}

sandbox_tool!(
    /// Creates a sandbox, optionally with extra packages.
    CreateSandboxTool, "createSandbox", "Create a new sandbox, returning a sandbox ID.",
    CreateSandboxArgs => CreateSandboxResponse, create_sandbox,
    parameters: CREATE_PARAMETERS,
    returns: object(json!({ "sandbox_id": { "type": "string" } }), &["sandbox_id"]),
    prompt: PROMPT
);

sandbox_tool!(
    TerminateSandboxTool, "terminateSandbox", "Terminate a sandbox by its ID.",
    TerminateSandboxArgs => StatusResponse, terminate_sandbox,
    parameters: SANDBOX_ID_PARAMETERS,
    returns: STATUS_RETURNS.clone()
);

sandbox_tool!(
    /// Runs an argv list, not a shell string.
    ExecCommandTool, "execCommand", "Execute a command in a sandbox.",
    ExecCommandArgs => ExecCommandResponse, exec_command,
    parameters: EXEC_PARAMETERS,
    returns: object(
        json!({
            "returncode": { "type": "integer" },
            "stdout": { "type": "string" },
            "stderr": { "type": "string" }
        }),
        &["returncode", "stdout", "stderr"],
    )
);

sandbox_tool!(
    ReadFileTool, "readFile", "Read a file from a sandbox.",
    ReadFileArgs => ReadFileResponse, read_file,
    parameters: READ_PARAMETERS,
    returns: object(json!({ "contents": { "type": "string" } }), &["contents"])
);

sandbox_tool!(
    WriteFileTool, "writeFile", "Write to a file in a sandbox.",
    WriteFileArgs => StatusResponse, write_file,
    parameters: WRITE_PARAMETERS,
    returns: STATUS_RETURNS.clone()
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tools::ToolRegistry;
    use crate::domain::foundation::{ConversationId, MessageId, UserId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SandboxBackend for FakeBackend {
        async fn create_sandbox(
            &self,
            args: CreateSandboxArgs,
        ) -> Result<CreateSandboxResponse, BackendError> {
            self.calls.lock().unwrap().push(format!("create {:?}", args.pip_packages));
            Ok(CreateSandboxResponse {
                sandbox_id: "sb-1".into(),
            })
        }

        async fn terminate_sandbox(
            &self,
            _args: TerminateSandboxArgs,
        ) -> Result<StatusResponse, BackendError> {
            Err(BackendError::status("terminate sandbox", "404 Not Found"))
        }

        async fn exec_command(
            &self,
            args: ExecCommandArgs,
        ) -> Result<ExecCommandResponse, BackendError> {
            Ok(ExecCommandResponse {
                returncode: 0,
                stdout: args.command.join(" "),
                stderr: String::new(),
            })
        }

        async fn read_file(&self, _args: ReadFileArgs) -> Result<ReadFileResponse, BackendError> {
            Ok(ReadFileResponse {
                contents: "print(1)".into(),
            })
        }

        async fn write_file(&self, _args: WriteFileArgs) -> Result<StatusResponse, BackendError> {
            Ok(StatusResponse {
                status: "ok".into(),
            })
        }
    }

    fn registry(backend: Arc<FakeBackend>) -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(CreateSandboxTool::new(backend.clone())))
            .with(Arc::new(TerminateSandboxTool::new(backend.clone())))
            .with(Arc::new(ExecCommandTool::new(backend.clone())))
            .with(Arc::new(ReadFileTool::new(backend.clone())))
            .with(Arc::new(WriteFileTool::new(backend)))
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
    async fn exec_round_trips_result_shape() {
        let reg = registry(Arc::new(FakeBackend::default()));
        let text = reg
            .execute_tool(
                &context(),
                "execCommand",
                r#"{"sandbox_id":"sb-1","command":["python","/tmp/code.py"]}"#,
            )
            .await
            .unwrap();
        let result: ExecCommandResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(result.returncode, 0);
        assert_eq!(result.stdout, "python /tmp/code.py");
    }

    #[tokio::test]
    async fn create_accepts_empty_arguments() {
        let backend = Arc::new(FakeBackend::default());
        let reg = registry(backend.clone());
        let text = reg.execute_tool(&context(), "createSandbox", "{}").await.unwrap();
        let result: CreateSandboxResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(result.sandbox_id, "sb-1");
        assert_eq!(backend.calls.lock().unwrap().as_slice(), ["create None"]);
    }

    #[tokio::test]
    async fn back_end_status_becomes_execution_failure() {
        let reg = registry(Arc::new(FakeBackend::default()));
        let err = reg
            .execute_tool(&context(), "terminateSandbox", r#"{"sandbox_id":"sb-9"}"#)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tool execution failed: Failed to terminate sandbox: 404 Not Found"
        );
    }

    #[test]
    fn only_create_carries_the_prompt() {
        let reg = registry(Arc::new(FakeBackend::default()));
        let prompts = reg.tool_prompts();
        assert!(prompts.starts_with("You have access to Modal sandboxes"));
        assert_eq!(prompts, PROMPT);
    }
}
