//! In-memory provider with scripted replies
//!
//! Lets the assistance wrapper and the interactive loop run without a network.

use crate::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderError,
    Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Provider that answers from a queue and records every request it saw
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(Ok(content.into()));
        self
    }

    /// Queue a failure
    pub fn fail(self, err: ProviderError) -> Self {
        self.push(Err(err));
        self
    }

    fn push(&self, reply: Result<String, ProviderError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Message lists of every request, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.messages.clone());
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(ProviderError::Other("mock has no reply queued".into())))?;

        Ok(CompletionResponse {
            id: format!("mock-{}", self.call_count()),
            model: request.model.unwrap_or_else(|| self.default_model().to_string()),
            usage: Usage {
                prompt_tokens: request.messages.len(),
                completion_tokens: 1,
                total_tokens: request.messages.len() + 1,
            },
            content: next,
            finish_reason: FinishReason::Stop,
        })
    }
}
