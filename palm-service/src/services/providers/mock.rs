//! Mock provider for testing.

use super::{FinishReason, ProviderError, ProviderResponse, VisionProvider, VisionRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum MockReply {
    Text(String),
    Empty,
    Fail(ProviderError),
}

/// Returns a canned completion and records what it was asked.
pub struct MockVisionProvider {
    reply: MockReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<VisionRequest>>,
}

impl MockVisionProvider {
    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Reply with `text` as the raw completion content.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Text(text.into()))
    }

    /// Reply with a completion that carries no content.
    pub fn empty() -> Self {
        Self::with_reply(MockReply::Empty)
    }

    /// Fail every call with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::with_reply(MockReply::Fail(error))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<VisionRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-vision"
    }

    async fn complete(&self, request: &VisionRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        match &self.reply {
            MockReply::Text(text) => Ok(ProviderResponse {
                text: Some(text.clone()),
                input_tokens: request.user_text.len() as u32 / 4,
                output_tokens: text.len() as u32 / 4,
                finish_reason: FinishReason::Complete,
            }),
            MockReply::Empty => Ok(ProviderResponse {
                text: None,
                input_tokens: 0,
                output_tokens: 0,
                finish_reason: FinishReason::Complete,
            }),
            MockReply::Fail(error) => Err(error.clone()),
        }
    }
}
