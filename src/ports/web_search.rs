//! Web search port - search, question answering and page extraction.
//!
//! Results are the back-end's own JSON payloads; they are handed to the
//! model as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How deep the search back-end digs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

/// Search category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    General,
    News,
    Finance,
}

/// Optional knobs shared by search and question answering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_depth: Option<SearchDepth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<SearchTopic>,
    /// Look-back window for news searches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_images: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_image_descriptions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_answer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_raw_content: Option<bool>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Searches the web for a term.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<serde_json::Value, BackendError>;

    /// Asks the web a question and returns the answer text.
    async fn answer(&self, query: &str, options: &SearchOptions) -> Result<String, BackendError>;

    /// Extracts the content of a list of pages.
    async fn extract(&self, urls: &[String]) -> Result<serde_json::Value, BackendError>;
}

/// Failures talking to an external tool back-end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The back-end answered with a non-success status.
    #[error("Failed to {action}: {status}")]
    Status { action: String, status: String },

    #[error("network error: {0}")]
    Network(String),

    /// The back-end answered with an unexpected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn status(action: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Status {
            action: action.into(),
            status: status.into(),
        }
    }
}
