//! Deterministic, network-free `ChatProvider` implementations.
//!
//! Real vendor SDKs are out of scope for this crate (spec.md treats them as
//! an abstract capability); these providers let every downstream crate be
//! exercised without one.

use std::sync::Mutex;

use arc_core::{ChatMessage, ChatProvider, ChatRequest, ChatResponse, LlmResult, MessageRole, TokenUsage};
use async_trait::async_trait;

/// Echoes the last user message back as the assistant response. Useful as a
/// harmless default and in tests that only care about message plumbing.
#[derive(Debug, Default)]
pub struct EchoProvider;

#[async_trait]
impl ChatProvider for EchoProvider {
    async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(ChatResponse {
            message: ChatMessage::assistant(last),
            usage: TokenUsage::default(),
            model: self.default_model().to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn default_model(&self) -> &str {
        "echo-1"
    }
}

/// Always returns a fixed, empty-ish final answer. Used where a call must
/// complete but its content is irrelevant to the test.
#[derive(Debug, Default)]
pub struct NullProvider;

#[async_trait]
impl ChatProvider for NullProvider {
    async fn chat(&self, _request: ChatRequest) -> LlmResult<ChatResponse> {
        Ok(ChatResponse {
            message: ChatMessage::assistant(""),
            usage: TokenUsage::default(),
            model: self.default_model().to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "null"
    }

    fn default_model(&self) -> &str {
        "null-1"
    }
}

/// Replays a fixed script of responses, one per call, regardless of the
/// request. The tool-call loop tests and agent tests drive scripted
/// `TOOL_REQUEST` sequences through this.
pub struct MockProvider {
    script: Mutex<Vec<String>>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of `chat` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock provider mutex poisoned").len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.calls.lock().expect("mock provider mutex poisoned").clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        self.calls.lock().expect("mock provider mutex poisoned").push(request);
        let mut script = self.script.lock().expect("mock provider mutex poisoned");
        let content = if script.is_empty() {
            String::new()
        } else {
            script.remove(0)
        };
        Ok(ChatResponse {
            message: ChatMessage::assistant(content),
            usage: TokenUsage::default(),
            model: self.default_model().to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-1"
    }
}

/// Role is asserted on in tests; re-exported here for convenience.
pub use MessageRole as Role;
