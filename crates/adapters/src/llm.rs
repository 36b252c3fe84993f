// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language-model client.
//!
//! One call: `invoke(prompt) -> response`. The engine provides concurrency;
//! no streaming and no tool-use protocol at this layer.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("cannot reach model endpoint: {0}")]
    Connection(String),
    #[error("model invocation timed out")]
    Timeout,
    #[error("model endpoint error ({status}): {body}")]
    Endpoint { status: u16, body: String },
    #[error("could not parse model response: {0}")]
    Parse(String),
    /// Test-support: scripted model ran out of responses.
    #[error("no scripted response remaining")]
    Exhausted,
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Connection(_) | LlmError::Timeout)
    }
}

/// The language model behind every content-producing worker.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError>;
}

/// HTTP model endpoint configuration.
#[derive(Debug, Clone)]
pub struct ModelEndpoint {
    pub base_url: String,
    pub model_id: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for ModelEndpoint {
    fn default() -> Self {
        Self {
            base_url: std::env::var("GT_MODEL_URL")
                .unwrap_or_else(|_| "http://localhost:8601".to_string()),
            model_id: std::env::var("GT_MODEL_ID")
                .unwrap_or_else(|_| "claude-opus".to_string()),
            api_token: std::env::var("GT_MODEL_TOKEN").ok(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl ModelEndpoint {
    /// Build the production HTTP client for this endpoint.
    pub fn client(self) -> Result<HttpModelClient, LlmError> {
        HttpModelClient::new(self)
    }
}

/// Production [`LanguageModel`] speaking a plain JSON completion API:
/// POST `{base_url}/invoke` with `{model, prompt}`, response
/// `{completion: "..."}`.
pub struct HttpModelClient {
    endpoint: ModelEndpoint,
    client: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(endpoint: ModelEndpoint) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl LanguageModel for HttpModelClient {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/invoke", self.endpoint.base_url.trim_end_matches('/'));
        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "model": self.endpoint.model_id, "prompt": prompt }));
        if let Some(token) = &self.endpoint.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Endpoint {
                status: status.as_u16(),
                body: body[..body.len().min(500)].to_string(),
            });
        }

        let data: Value = response.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        let text = data
            .get("completion")
            .or_else(|| data.get("response"))
            .or_else(|| data.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Parse("no completion field in response".into()))?;
        tracing::debug!(chars = text.len(), model = %self.endpoint.model_id, "model response received");
        Ok(text.to_string())
    }
}

/// Scripted model for tests: returns canned responses in order and records
/// every prompt it sees.
#[cfg(any(test, feature = "test-support"))]
pub struct ScriptedModel {
    responses: parking_lot::Mutex<std::collections::VecDeque<String>>,
    prompts: parking_lot::Mutex<Vec<String>>,
    /// When the script runs dry, repeat this instead of failing.
    fallback: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedModel {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: parking_lot::Mutex::new(
                responses.into_iter().map(str::to_string).collect(),
            ),
            prompts: parking_lot::Mutex::new(Vec::new()),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Prompts seen so far, in invocation order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(next) = self.responses.lock().pop_front() {
            return Ok(next);
        }
        self.fallback.clone().ok_or(LlmError::Exhausted)
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
