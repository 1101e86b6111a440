//! Chat-completions client for task decomposition
//!
//! Speaks the OpenAI-compatible `/v1/chat/completions` endpoint with bearer
//! auth. The assistant's reply is expected to be a JSON array of subtask
//! strings, optionally wrapped in a markdown code fence.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::DecomposeError;
use crate::config::LlmConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Instruction sent as the system message of every decomposition request
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a task decomposition expert. Break the task given by the \
     user into a short list of concrete subtasks. Reply with a JSON array \
     containing the subtask strings directly, and nothing else.";

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// A source of subtask decompositions
///
/// The engine only depends on this trait; tests substitute a stub.
#[async_trait]
pub trait DecomposeClient: Send + Sync {
    /// Decompose a task description into subtask texts
    ///
    /// One call is one logical request: it resolves exactly once, to either
    /// a (possibly empty) list of non-empty strings or an error.
    async fn decompose(&self, task_text: &str) -> Result<Vec<String>, DecomposeError>;
}

/// HTTP client for an OpenAI-compatible completion service
pub struct HttpDecomposer {
    model: String,
    api_key: String,
    base_url: String,
    system_prompt: String,
    http: Client,
}

impl HttpDecomposer {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, DecomposeError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.get_api_key().map_err(|e| DecomposeError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(DecomposeError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            http,
        })
    }

    /// Build the request body for the chat completions API
    fn build_request_body(&self, task_text: &str) -> serde_json::Value {
        debug!(%self.model, "build_request_body: called");
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": task_text },
            ],
            "stream": false,
        })
    }

    /// Parse an assistant message into subtask texts
    fn parse_content(content: &str) -> Result<Vec<String>, DecomposeError> {
        let cleaned = strip_code_fences(content);
        let subtasks: Vec<String> = serde_json::from_str(cleaned)
            .map_err(|e| DecomposeError::InvalidPayload(format!("expected a JSON array of strings: {}", e)))?;
        if subtasks.iter().any(|s| s.trim().is_empty()) {
            return Err(DecomposeError::InvalidPayload(
                "subtask list contains empty text".to_string(),
            ));
        }
        Ok(subtasks)
    }
}

#[async_trait]
impl DecomposeClient for HttpDecomposer {
    async fn decompose(&self, task_text: &str) -> Result<Vec<String>, DecomposeError> {
        debug!(%self.model, task_text, "decompose: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(task_text);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "decompose: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "decompose: network error");
                    last_error = Some(DecomposeError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "decompose: retryable error");
                last_error = Some(DecomposeError::Api { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                debug!(status, "decompose: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(DecomposeError::Api { status, message: text });
            }

            let text = response.text().await.map_err(DecomposeError::Network)?;
            let api_response: ChatResponse = serde_json::from_str(&text)
                .map_err(|e| DecomposeError::InvalidPayload(format!("unparsable response body: {}", e)))?;

            let content = api_response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| DecomposeError::InvalidPayload("response contained no assistant message".to_string()))?;

            debug!("decompose: success");
            return Self::parse_content(&content);
        }

        Err(last_error.unwrap_or_else(|| DecomposeError::InvalidPayload("max retries exceeded".to_string())))
    }
}

/// Strip a surrounding markdown code fence, if any
fn strip_code_fences(s: &str) -> &str {
    let mut t = s.trim();
    if let Some(rest) = t.strip_prefix("```") {
        // drop the fence line, including an optional language tag
        t = match rest.split_once('\n') {
            Some((_, body)) => body,
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    t = t.trim();
    if let Some(rest) = t.strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

// Chat completions response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
