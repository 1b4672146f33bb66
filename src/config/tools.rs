//! External tool back-ends

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Credentials for the optional tool families.
///
/// A family is only offered to the model when its credentials are present.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    pub tavily_api_key: Option<SecretString>,

    #[serde(default = "default_tavily_base_url")]
    pub tavily_base_url: String,

    /// Sandbox back-end endpoint
    pub sandbox_url: Option<String>,

    /// Shared secret sent with every sandbox request
    pub sandbox_secret: Option<SecretString>,

    /// Sandbox request timeout in seconds
    #[serde(default = "default_sandbox_timeout")]
    pub sandbox_timeout_secs: u64,
}

impl ToolsConfig {
    /// The Tavily key, when web search is enabled.
    pub fn tavily_api_key(&self) -> Option<&str> {
        self.tavily_api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
    }

    /// Endpoint and secret, when sandboxes are enabled.
    pub fn sandbox(&self) -> Option<(&str, &str)> {
        let url = self.sandbox_url.as_deref().filter(|u| !u.is_empty())?;
        let secret = self
            .sandbox_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.is_empty())?;
        Some((url, secret))
    }

    pub fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(self.sandbox_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_url = self.sandbox_url.as_deref().is_some_and(|u| !u.is_empty());
        let has_secret = self
            .sandbox_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty());
        if has_url != has_secret {
            return Err(ValidationError::IncompletePair(
                "TOOLS__SANDBOX_URL",
                "TOOLS__SANDBOX_SECRET",
            ));
        }
        if let Some(url) = self.sandbox_url.as_deref().filter(|u| !u.is_empty()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidBaseUrl("sandbox"));
            }
        }
        if !self.tavily_base_url.starts_with("http://")
            && !self.tavily_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidBaseUrl("tavily"));
        }
        Ok(())
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_base_url: default_tavily_base_url(),
            sandbox_url: None,
            sandbox_secret: None,
            sandbox_timeout_secs: default_sandbox_timeout(),
        }
    }
}

fn default_tavily_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_sandbox_timeout() -> u64 {
    600
}
