//! Completion Client Module
//!
//! One seam for every chat-completion call the pipeline makes. The
//! [`ChatBackend`] trait hides the transport; [`LlmClient`] is the real
//! HTTP implementation (OpenAI-compatible endpoint, bearer auth, fixed
//! 30-second timeout, no retries) and [`StubBackend`] returns canned
//! responses while recording invocation counts for tests and offline
//! runs.

use crate::config::{AppConfig, REQUEST_TIMEOUT_SECS};
use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Message role (universal subset across providers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a chat-completion conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Parameters for one completion call
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Transport seam for chat completions
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one completion request and return the response text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}

/// HTTP client for an OpenAI-compatible chat-completion endpoint
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    /// Create a client with the fixed request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(&config.base_url, &config.api_key, &config.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the JSON request body for one completion call
    fn request_body(&self, request: &CompletionRequest) -> JsonValue {
        serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    /// Pull the completion text out of a response document
    fn extract_content(response: &JsonValue) -> Result<String, ServiceError> {
        let content = response["choices"]
            .get(0)
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ServiceError::Transport("missing choices[0].message.content".to_string())
            })?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Transport("empty completion content".to_string()));
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("Sending completion request to {url}");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Transport(format!(
                "completion endpoint returned {status}: {body}"
            )));
        }

        let document: JsonValue = response.json().await?;
        Self::extract_content(&document)
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}

/// Canned backend for tests and offline use.
///
/// Returns queued responses in order, repeating the last one once the
/// queue runs dry, and counts every invocation.
pub struct StubBackend {
    responses: Mutex<VecDeque<String>>,
    last: String,
    calls: AtomicUsize,
}

impl StubBackend {
    /// Stub that always returns `response`
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Stub that returns `responses` in order, then repeats the final one
    pub fn with_responses(responses: Vec<String>) -> Self {
        let last = responses.last().cloned().unwrap_or_default();
        Self {
            responses: Mutex::new(responses.into()),
            last,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completion calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.responses.lock().expect("stub queue poisoned");
        match queue.pop_front() {
            Some(next) => Ok(next),
            None => Ok(self.last.clone()),
        }
    }

    fn backend_name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let message = ChatMessage::system("rules");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"], "rules");
    }

    #[test]
    fn test_request_body_shape() {
        let client = LlmClient::new("https://api.example.com/v1", "key", "test-model").unwrap();
        let request = CompletionRequest {
            messages: vec![ChatMessage::system("s"), ChatMessage::user("q")],
            max_tokens: 500,
            temperature: 0.1,
        };

        let body = client.request_body(&request);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "q");
    }

    #[test]
    fn test_extract_content_reads_first_choice() {
        let document = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  SELECT 1  "}}]
        });
        assert_eq!(LlmClient::extract_content(&document).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_extract_content_missing_field_is_transport_error() {
        let document = serde_json::json!({"choices": []});
        let err = LlmClient::extract_content(&document).unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_extract_content_empty_is_transport_error() {
        let document = serde_json::json!({
            "choices": [{"message": {"content": "   "}}]
        });
        assert!(LlmClient::extract_content(&document).is_err());
    }

    #[tokio::test]
    async fn test_stub_backend_counts_and_sequences() {
        let stub = StubBackend::with_responses(vec!["first".to_string(), "second".to_string()]);
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("q")],
            max_tokens: 10,
            temperature: 0.0,
        };

        assert_eq!(stub.complete(&request).await.unwrap(), "first");
        assert_eq!(stub.complete(&request).await.unwrap(), "second");
        // Queue exhausted: the last response repeats
        assert_eq!(stub.complete(&request).await.unwrap(), "second");
        assert_eq!(stub.call_count(), 3);
    }
}
