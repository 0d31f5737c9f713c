//! Assistance wrapper - the prompts the interactive loop sends
//!
//! `get_assistance` never fails: a rate limit or any other provider error is
//! logged and replaced by a fixed reply, so the caller can always print
//! something. The other helpers return the error and let the caller decide.

use crate::fence::extract_script_content;
use crate::prompts::{self, ScriptDialect};
use crate::provider::{ChatMessage, CompletionRequest, LlmProvider, ProviderError, UsageTracker};
use tracing::{debug, error, trace, warn};

/// Reply substituted when the provider reports a rate limit / quota error
pub const QUOTA_EXCEEDED: &str = "Quota exceeded error";

/// Reply substituted for every other provider failure
pub const ASSISTANCE_FAILED: &str = "Error getting assistance";

/// A script requested from the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReply {
    /// The raw model reply
    pub reply: String,
    /// Lines found inside fenced blocks; empty when the model sent none
    pub lines: Vec<String>,
}

/// Sends prompts through a provider and keeps usage totals
pub struct Assistant<P> {
    provider: P,
    model: Option<String>,
    usage: UsageTracker,
}

impl<P: LlmProvider> Assistant<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            model: None,
            usage: UsageTracker::new(),
        }
    }

    /// Override the provider's default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Ask for help with a single prompt. Always returns printable text.
    pub async fn get_assistance(&mut self, prompt: &str) -> String {
        debug!(provider = self.provider.name(), "sending prompt for assistance");
        let messages = vec![
            ChatMessage::system(prompts::HELPFUL_ASSISTANT),
            ChatMessage::user(prompt),
        ];

        match self.send(messages).await {
            Ok(reply) => reply.trim().to_string(),
            Err(err) if err.is_rate_limited() => {
                warn!("Quota exceeded: {}", err);
                QUOTA_EXCEEDED.to_string()
            }
            Err(err) => {
                error!("Error calling OpenAI API: {}", err);
                ASSISTANCE_FAILED.to_string()
            }
        }
    }

    /// Ask the model to describe command output
    pub async fn analyze_output(&mut self, output: &str) -> Result<String, ProviderError> {
        self.send(vec![
            ChatMessage::system(prompts::ANALYZE_OUTPUT),
            ChatMessage::user(output),
        ])
        .await
    }

    /// Continue a free-form conversation
    pub async fn talk(&mut self, conversation: &[ChatMessage]) -> Result<String, ProviderError> {
        self.send(conversation.to_vec()).await
    }

    /// Ask for a script answering the last user message.
    ///
    /// The translate instructions are appended to a copy of `conversation`;
    /// the caller's history is left as it was.
    pub async fn request_script(
        &mut self,
        conversation: &[ChatMessage],
        cwd: &str,
        dialect: ScriptDialect,
    ) -> Result<ScriptReply, ProviderError> {
        let mut messages = conversation.to_vec();
        messages.push(ChatMessage::system(dialect.translate_prompt(cwd)));

        let reply = self.send(messages).await?;
        let lines = extract_script_content(&reply);
        debug!(lines = lines.len(), "extracted script from reply");

        Ok(ScriptReply { reply, lines })
    }

    async fn send(&mut self, messages: Vec<ChatMessage>) -> Result<String, ProviderError> {
        let mut request = CompletionRequest::new(messages);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        let response = self.provider.complete(request).await?;
        self.usage.track(&response.model, &response.usage);
        trace!(id = %response.id, content = %response.content, "model reply");

        Ok(response.content)
    }
}
