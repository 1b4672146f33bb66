//! Tavily web search client.
//!
//! Options arrive from the model in camelCase and go out in the snake_case
//! the API expects. Question answering forces an advanced search with an
//! answer and returns only the answer text.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ensure_success, network};
use crate::ports::{BackendError, SearchDepth, SearchOptions, SearchTopic, WebSearch};

#[derive(Clone)]
pub struct TavilyConfig {
    api_key: SecretString,
    base_url: String,
    timeout: Duration,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: "https://api.tavily.com".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for TavilyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Body of `POST /search`.
#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    api_key: &'a str,
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_depth: Option<SearchDepth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<SearchTopic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_image_descriptions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_answer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_raw_content: Option<bool>,
}

impl<'a> SearchBody<'a> {
    fn new(api_key: &'a str, query: &'a str, options: &SearchOptions) -> Self {
        Self {
            api_key,
            query,
            search_depth: options.search_depth,
            topic: options.topic,
            days: options.days,
            max_results: options.max_results,
            include_images: options.include_images,
            include_image_descriptions: options.include_image_descriptions,
            include_answer: options.include_answer,
            include_raw_content: options.include_raw_content,
        }
    }

    fn for_answer(mut self) -> Self {
        self.include_answer = Some(true);
        self.search_depth = Some(SearchDepth::Advanced);
        self
    }
}

#[derive(Debug, Serialize)]
struct ExtractBody<'a> {
    api_key: &'a str,
    urls: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: Option<String>,
}

pub struct TavilyClient {
    client: reqwest::Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(network)?;
        Ok(Self { client, config })
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        action: &str,
    ) -> Result<serde_json::Value, BackendError> {
        let response = self
            .client
            .post(format!("{}/{}", self.config.base_url, path))
            .json(body)
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
impl WebSearch for TavilyClient {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<serde_json::Value, BackendError> {
        let key = self.config.api_key.expose_secret();
        self.post("search", &SearchBody::new(key, query, options), "search")
            .await
    }

    async fn answer(&self, query: &str, options: &SearchOptions) -> Result<String, BackendError> {
        let key = self.config.api_key.expose_secret();
        let body = SearchBody::new(key, query, options).for_answer();
        let value = self.post("search", &body, "search").await?;
        let response: AnswerResponse = serde_json::from_value(value)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        response
            .answer
            .ok_or_else(|| BackendError::InvalidResponse("missing answer".to_string()))
    }

    async fn extract(&self, urls: &[String]) -> Result<serde_json::Value, BackendError> {
        let key = self.config.api_key.expose_secret();
        self.post("extract", &ExtractBody { api_key: key, urls }, "extract")
            .await
    }
}
