//! Mock backend for testing and offline runs
//!
//! Answers every chat request locally. Selected with `--backend mock` so a
//! whole crew can run without network access.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::types::{ChatRequest, ChatResponse, TokenUsage};

use super::ChatBackend;

// ─────────────────────────────────────────────────────────────────
// Mock Backend Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock backend behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Fixed response text; when unset the last user message is echoed
    pub fixed_response: Option<String>,

    /// Fail every chat call
    pub fail_chat: bool,
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of `ChatBackend`
pub struct MockBackend {
    config: MockConfig,
    scripted: RwLock<VecDeque<ChatResponse>>,
    requests: RwLock<Vec<ChatRequest>>,
}

impl MockBackend {
    /// Create a new mock backend with default config
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create with custom config
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            scripted: RwLock::new(VecDeque::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Create a mock that always answers with `response`
    pub fn fixed_response(response: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            fixed_response: Some(response.into()),
            ..Default::default()
        })
    }

    /// Create a mock whose chat calls always fail
    pub fn failing() -> Self {
        Self::with_config(MockConfig {
            fail_chat: true,
            ..Default::default()
        })
    }

    /// Queue a response returned before the fixed/echo behaviour kicks in
    pub fn push_response(&self, response: ChatResponse) {
        self.scripted.write().push_back(response);
    }

    /// Number of chat calls received
    pub fn chat_calls(&self) -> usize {
        self.requests.read().len()
    }

    /// Copy of every request received, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.read().clone()
    }

    fn default_response(&self, request: &ChatRequest) -> ChatResponse {
        let text = match &self.config.fixed_response {
            Some(fixed) => fixed.clone(),
            None => format!(
                "Mock response to: {}",
                request.last_user_content().unwrap_or_default()
            ),
        };
        let prompt_words = request
            .messages
            .iter()
            .filter_map(|m| m.content.as_deref())
            .map(|c| c.split_whitespace().count())
            .sum::<usize>();
        let completion_words = text.split_whitespace().count();

        ChatResponse {
            usage: TokenUsage::new(prompt_words as u32, completion_words as u32),
            ..ChatResponse::text(text)
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> String {
        "mock-model".to_string()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.requests.write().push(request.clone());

        if self.config.fail_chat {
            return Err(Error::ApiStatus {
                status: 500,
                body: "Mock chat failure".to_string(),
            });
        }

        if let Some(scripted) = self.scripted.write().pop_front() {
            return Ok(scripted);
        }

        Ok(self.default_response(&request))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, ToolCall};

    fn request(text: &str) -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::system("sys"), ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_echo_response() {
        let backend = MockBackend::new();
        let response = backend.chat(request("Summarize EEG")).await.unwrap();
        assert_eq!(
            response.content.as_deref(),
            Some("Mock response to: Summarize EEG")
        );
        assert_eq!(backend.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let backend = MockBackend::fixed_response("Fixed output");
        let response = backend.chat(request("anything")).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("Fixed output"));
        assert_eq!(response.usage.completion_tokens, 2);
    }

    #[tokio::test]
    async fn test_failure() {
        let backend = MockBackend::failing();
        let err = backend.chat(request("x")).await.unwrap_err();
        assert!(matches!(err, Error::ApiStatus { status: 500, .. }));
        assert_eq!(backend.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_responses_come_first() {
        let backend = MockBackend::fixed_response("final");
        backend.push_response(ChatResponse {
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: "web_search".into(),
                arguments: "{}".into(),
            }],
            ..Default::default()
        });

        let first = backend.chat(request("a")).await.unwrap();
        assert!(first.wants_tools());
        let second = backend.chat(request("b")).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("final"));

        let seen = backend.requests();
        assert_eq!(seen[0].last_user_content(), Some("a"));
        assert_eq!(seen[1].last_user_content(), Some("b"));
    }
}
