//! # sshelper LLM
//!
//! Everything that talks to the model or reads what it said.
//!
//! ## Core Concepts
//! - **Provider**: Trait-based chat-completion client (OpenAI compatible)
//! - **Assistant**: Prompt wrappers that turn provider failures into fixed replies
//! - **Fence**: Pulls command lines out of triple-backtick blocks in a reply
//! - **Credentials**: API key loading from the environment

pub mod assist;
pub mod credentials;
pub mod error;
pub mod fence;
pub mod mock;
pub mod prompts;
pub mod provider;

pub use assist::{Assistant, ScriptReply, ASSISTANCE_FAILED, QUOTA_EXCEEDED};
pub use credentials::{api_key_from, api_key_from_env, API_KEY_VAR};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use fence::{code_blocks, extract_script_content, CodeBlock};
pub use mock::MockProvider;
pub use prompts::ScriptDialect;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, Role, Usage, UsageTracker,
};
