//! HTTP clients for the external tool back-ends.
//!
//! - `TavilyClient` - web search, question answering and page extraction
//! - `SandboxClient` - code sandboxes behind a single shared-secret endpoint

mod sandbox_client;
mod tavily_client;

pub use sandbox_client::{SandboxClient, SandboxConfig};
pub use tavily_client::{TavilyClient, TavilyConfig};

use crate::ports::BackendError;

fn network(err: reqwest::Error) -> BackendError {
    BackendError::Network(err.to_string())
}

/// Fails with "Failed to <action>: <status>" on a non-success status.
fn ensure_success(
    response: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::status(action, status.to_string()))
    }
}
