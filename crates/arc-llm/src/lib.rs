//! Provider-agnostic chat completion (C4): a thin retry/serialization
//! decorator over `arc_core::ChatProvider`, plus deterministic test
//! providers so every downstream crate can be exercised without a real
//! vendor SDK.

mod providers;
mod retry;

use std::sync::Arc;

use arc_core::{ChatProvider, ChatRequest, ChatResponse, LlmResult};
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

pub use providers::{EchoProvider, MockProvider, NullProvider};
pub use retry::{retry_with_backoff, RetryConfig};

/// Wraps a `ChatProvider` with bounded retry-with-backoff and optional
/// per-provider call serialization.
///
/// Concurrent callers are serialized only if the provider mandates it
/// (spec.md §4.4): pass `serialize: true` to route every call through an
/// internal mutex permit; otherwise calls run fully concurrently, bounded
/// only by the caller.
pub struct RetryingProvider<P: ChatProvider> {
    inner: P,
    retry: RetryConfig,
    permit: Option<Arc<AsyncMutex<()>>>,
}

impl<P: ChatProvider> RetryingProvider<P> {
    pub fn new(inner: P, retry: RetryConfig) -> Self {
        Self { inner, retry, permit: None }
    }

    /// Serialize every call to this provider behind a single permit.
    pub fn serialized(mut self) -> Self {
        self.permit = Some(Arc::new(AsyncMutex::new(())));
        self
    }
}

#[async_trait]
impl<P: ChatProvider> ChatProvider for RetryingProvider<P> {
    async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        let _permit = match &self.permit {
            Some(mutex) => Some(mutex.lock().await),
            None => None,
        };
        retry_with_backoff(self.retry, || self.inner.chat(request.clone())).await
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn default_model(&self) -> &str {
        self.inner.default_model()
    }

    async fn health_check(&self) -> LlmResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_core::ChatMessage;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FlakyProvider {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl ChatProvider for FlakyProvider {
        async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
            if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(arc_core::LlmError::Timeout);
            }
            let echoed = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                message: ChatMessage::assistant(echoed),
                usage: Default::default(),
                model: "flaky-1".to_string(),
            })
        }

        fn provider_name(&self) -> &str {
            "flaky"
        }

        fn default_model(&self) -> &str {
            "flaky-1"
        }
    }

    #[tokio::test]
    async fn retrying_provider_recovers_from_transient_failures() {
        let provider = RetryingProvider::new(
            FlakyProvider { failures_remaining: AtomicU32::new(2) },
            RetryConfig { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), ..Default::default() },
        );
        let response = provider.chat(ChatRequest::new(vec![ChatMessage::user("hi")])).await.unwrap();
        assert_eq!(response.message.content, "hi");
    }

    #[tokio::test]
    async fn retrying_provider_exhausts_attempts_and_surfaces_error() {
        let provider = RetryingProvider::new(
            FlakyProvider { failures_remaining: AtomicU32::new(10) },
            RetryConfig { max_attempts: 2, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), ..Default::default() },
        );
        let result = provider.chat(ChatRequest::new(vec![ChatMessage::user("hi")])).await;
        assert!(result.is_err());
    }
}
