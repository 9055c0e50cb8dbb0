//! Model provider clients and routing
//!
//! Every provider is reduced to one operation, [`ModelClient::generate_content`].
//! [`ModelRouter`] picks a provider per call with ordered fallback;
//! [`PromptRouter`] is the simpler single-shot path.

mod chat;
pub mod client;
mod error;
pub mod extract;
mod fallback;
mod gemini;
pub mod router;

pub use chat::{ChatCompletionsClient, ChatMessage};
pub use client::{ModelClient, TimeoutClient};
pub use error::LlmError;
pub use extract::{ModelJson, RawOutput, extract_json, strip_code_fences};
pub use fallback::{ARCHITECT_SYSTEM_PROMPT, PromptRouter, RoutedOutput, is_code_heavy};
pub use gemini::GeminiClient;
pub use router::{
    ClientFactory, ConfigClientFactory, CostTier, ModelRouter, Provider, ProviderAttempt, RoutedModel, RouterError,
    TaskType,
};
