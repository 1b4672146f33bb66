//! Sandbox back-end client.
//!
//! Every operation is a POST to one URL with body `{secret, type, ...args}`.
//! Responses are decoded into the declared result shape; anything else is
//! an invalid response.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{ensure_success, network};
use crate::ports::{
    BackendError, CreateSandboxArgs, CreateSandboxResponse, ExecCommandArgs, ExecCommandResponse,
    ReadFileArgs, ReadFileResponse, SandboxBackend, StatusResponse, TerminateSandboxArgs,
    WriteFileArgs,
};

#[derive(Clone)]
pub struct SandboxConfig {
    url: String,
    secret: SecretString,
    /// Package installs and long commands run inside a single request.
    timeout: Duration,
}

impl SandboxConfig {
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: SecretString::new(secret.into()),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for SandboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxConfig")
            .field("url", &self.url)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct Envelope<'a, A> {
    secret: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    args: &'a A,
}

pub struct SandboxClient {
    client: reqwest::Client,
    config: SandboxConfig,
}

impl SandboxClient {
    pub fn new(config: SandboxConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(network)?;
        Ok(Self { client, config })
    }

    async fn call<A, R>(&self, kind: &'static str, action: &str, args: &A) -> Result<R, BackendError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        tracing::debug!(kind, "Calling sandbox back-end");
        let body = Envelope {
            secret: self.config.secret.expose_secret(),
            kind,
            args,
        };
        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        let response = ensure_success(response, action)?;
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SandboxBackend for SandboxClient {
    async fn create_sandbox(
        &self,
        args: CreateSandboxArgs,
    ) -> Result<CreateSandboxResponse, BackendError> {
        self.call("create_sandbox", "create sandbox", &args).await
    }

    async fn terminate_sandbox(
        &self,
        args: TerminateSandboxArgs,
    ) -> Result<StatusResponse, BackendError> {
        self.call("terminate_sandbox", "terminate sandbox", &args).await
    }

    async fn exec_command(
        &self,
        args: ExecCommandArgs,
    ) -> Result<ExecCommandResponse, BackendError> {
        self.call("exec_command", "execute command", &args).await
    }

    async fn read_file(&self, args: ReadFileArgs) -> Result<ReadFileResponse, BackendError> {
        self.call("read_file", "read file", &args).await
    }

    async fn write_file(&self, args: WriteFileArgs) -> Result<StatusResponse, BackendError> {
        self.call("write_file", "write file", &args).await
    }
}
