//! The provider-agnostic chat completion surface. Every LLM-backed agent
//! stage talks to a `ChatProvider`, never to a concrete vendor SDK.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One turn of a chat conversation.
///
/// Tool invocations in this engine ride inside `content` as a
/// `<<<[TOOL_REQUEST]>>>` text block rather than a provider tool-call field —
/// see the context crate's loop parser — so `ChatMessage` stays a plain
/// three-field struct instead of mirroring a vendor function-calling schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// A request to a `ChatProvider`. `messages` is expected to be built with the
/// static-prefix-first discipline described by the context manager: system
/// prompt, then tiered note context, then history, so that providers which
/// cache prompt prefixes see a stable prefix across calls for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages, model: None, temperature: None, max_tokens: None }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub usage: TokenUsage,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm provider request failed: {0}")]
    Request(String),
    #[error("llm provider returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("llm provider rate limited the request: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("llm provider timed out")]
    Timeout,
    #[error("llm provider request failed with a server error: {0}")]
    ServerError(String),
    /// Auth failures and other permanent 4xx errors. Never retried.
    #[error("llm provider rejected the request: {0}")]
    Fatal(String),
}

impl LlmError {
    /// Transient failures (timeout, 5xx, rate-limit) are retried with
    /// backoff; fatal failures (auth, other permanent 4xx) are surfaced
    /// immediately. See spec §7 "LLM transient" vs "LLM fatal".
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Timeout | LlmError::RateLimited { .. } | LlmError::ServerError(_))
    }
}

pub type LlmResult<T> = Result<T, LlmError>;

/// A chat completion backend. Implementations range from real vendor clients
/// to the deterministic mocks used in tests — callers upstream of this trait
/// never branch on which one they hold.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse>;

    fn provider_name(&self) -> &str;

    fn default_model(&self) -> &str;

    async fn health_check(&self) -> LlmResult<bool> {
        Ok(true)
    }
}
