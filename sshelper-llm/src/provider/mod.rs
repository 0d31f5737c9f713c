//! Chat-completion provider interface
//!
//! `LlmProvider` is the seam between the assistance code and a backend.
//! `OpenAIProvider` speaks the OpenAI chat-completions API, which also covers
//! compatible servers. Callers only ever read the first choice.

pub mod openai;

pub use openai::OpenAIProvider;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Wire name is the lowercase variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One chat-completion call; `model` falls back to the provider default
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// The first choice of a completion plus bookkeeping
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    /// Model that actually answered, as reported by the server
    pub model: String,
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

impl FinishReason {
    pub fn parse(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug)]
pub enum ProviderError {
    /// Request never got a response
    Network(String),
    /// Non-success status other than 401 and 429
    Api { status: u16, message: String },
    /// Response body was not the expected JSON
    Parse(String),
    /// HTTP 429: rate limit or exhausted quota
    RateLimited { retry_after: Option<u64> },
    /// HTTP 401
    AuthenticationFailed,
    /// Zero choices
    EmptyResponse,
    Other(String),
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "unreadable response: {}", e),
            Self::RateLimited { retry_after: Some(secs) } => write!(f, "rate limited, retry after {}s", secs),
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::EmptyResponse => write!(f, "no choices in response"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

/// A chat-completion backend
#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Short name for logs, e.g. "openai"
    fn name(&self) -> &str;

    fn default_model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Single user message, first choice text back
    async fn prompt(&self, prompt: &str) -> Result<String, ProviderError> {
        self.chat(vec![ChatMessage::user(prompt)]).await
    }

    /// Whole conversation, first choice text back
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        Ok(self.complete(CompletionRequest::new(messages)).await?.content)
    }
}

/// Where and how to reach a provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// api.openai.com with `gpt-3.5-turbo` and a 120s timeout
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Some(OPENAI_BASE_URL.into()),
            default_model: Some(DEFAULT_MODEL.into()),
            timeout_secs: Some(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Token counts summed per model
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    calls: usize,
    by_model: BTreeMap<String, Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, model: &str, usage: &Usage) {
        self.calls += 1;
        self.by_model.entry(model.to_string()).or_default().add(usage);
    }

    /// Successful completions seen
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn for_model(&self, model: &str) -> Option<&Usage> {
        self.by_model.get(model)
    }

    pub fn total(&self) -> Usage {
        let mut total = Usage::default();
        for usage in self.by_model.values() {
            total.add(usage);
        }
        total
    }
}
