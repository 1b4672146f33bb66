//! Sandbox port - long-lived code execution containers.
//!
//! Sandboxes outlive a single tool call and expire on the back-end after a
//! period of inactivity; nothing here tracks their lifetime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::BackendError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSandboxArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt_packages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_packages: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSandboxResponse {
    pub sandbox_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateSandboxArgs {
    pub sandbox_id: String,
}

/// Acknowledgement returned by terminate and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCommandArgs {
    pub sandbox_id: String,
    /// Program and arguments, not a shell string.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCommandResponse {
    pub returncode: i64,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileArgs {
    pub sandbox_id: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileResponse {
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFileArgs {
    pub sandbox_id: String,
    pub path: String,
    pub contents: String,
}

#[async_trait]
pub trait SandboxBackend: Send + Sync {
    async fn create_sandbox(
        &self,
        args: CreateSandboxArgs,
    ) -> Result<CreateSandboxResponse, BackendError>;

    async fn terminate_sandbox(
        &self,
        args: TerminateSandboxArgs,
    ) -> Result<StatusResponse, BackendError>;

    async fn exec_command(&self, args: ExecCommandArgs)
        -> Result<ExecCommandResponse, BackendError>;

    async fn read_file(&self, args: ReadFileArgs) -> Result<ReadFileResponse, BackendError>;

    async fn write_file(&self, args: WriteFileArgs) -> Result<StatusResponse, BackendError>;
}
