//! Single-shot prompt routing
//!
//! A simpler path than [`ModelRouter`](super::ModelRouter): code-heavy prompts
//! go to the secondary chat provider first and fall back to the primary when
//! that call fails or comes back empty. The primary client is only built
//! when a prompt actually reaches it.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use super::{ClientFactory, LlmError, ModelClient, Provider};

/// System message sent with secondary-provider calls
pub const ARCHITECT_SYSTEM_PROMPT: &str = "You are a senior software architect.";

static CODE_HEAVY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(code|api|docker|kubernetes|sql|backend|cloud run|firebase|react|node)").expect("valid regex")
});

/// Whether a prompt mentions implementation or infrastructure terms
pub fn is_code_heavy(text: &str) -> bool {
    CODE_HEAVY.is_match(text)
}

/// Which provider answered, and what it said
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedOutput {
    #[serde(rename = "usedModel")]
    pub model: Provider,
    #[serde(rename = "result")]
    pub output: String,
}

/// Primary/secondary routing for one-off prompts
pub struct PromptRouter {
    factory: Arc<dyn ClientFactory>,
    secondary: Option<Arc<dyn ModelClient>>,
}

impl PromptRouter {
    /// The primary comes from `factory` on demand; `secondary` is `None` when
    /// the chat provider is not configured
    pub fn new(factory: Arc<dyn ClientFactory>, secondary: Option<Arc<dyn ModelClient>>) -> Self {
        Self { factory, secondary }
    }

    pub async fn route_prompt(&self, prompt: &str) -> Result<RoutedOutput, LlmError> {
        debug!(prompt_len = prompt.len(), has_secondary = self.secondary.is_some(), "route_prompt: called");
        if is_code_heavy(prompt)
            && let Some(secondary) = &self.secondary
        {
            match secondary.generate_content(prompt).await {
                Ok(output) if !output.trim().is_empty() => {
                    debug!("route_prompt: secondary answered");
                    return Ok(RoutedOutput {
                        model: Provider::Llama,
                        output,
                    });
                }
                Ok(_) => warn!("Secondary provider returned empty output, falling back to primary"),
                Err(e) => warn!(error = %e, "Secondary provider failed, falling back to primary"),
            }
        }

        let primary = self.factory.build(Provider::Gemini)?;
        let output = primary.generate_content(prompt).await?;
        Ok(RoutedOutput {
            model: Provider::Gemini,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockModelClient;
    use crate::llm::router::mock::MockClientFactory;

    fn clients(secondary: MockModelClient) -> (Arc<MockModelClient>, Arc<MockModelClient>, PromptRouter) {
        let primary = Arc::new(MockModelClient::fixed("gemini", "from primary"));
        let secondary = Arc::new(secondary);
        let factory = MockClientFactory::default().with(Provider::Gemini, primary.clone());
        let router = PromptRouter::new(Arc::new(factory), Some(secondary.clone() as Arc<dyn ModelClient>));
        (primary, secondary, router)
    }

    #[test]
    fn test_code_heavy_detection() {
        assert!(is_code_heavy("Design a REST API"));
        assert!(is_code_heavy("deploy on Cloud Run"));
        assert!(is_code_heavy("a React dashboard"));
        assert!(!is_code_heavy("plan a wedding"));
    }

    #[tokio::test]
    async fn test_code_heavy_prefers_secondary() {
        let (primary, secondary, router) = clients(MockModelClient::fixed("llama", "from secondary"));
        let out = router.route_prompt("write the backend").await.unwrap();
        assert_eq!(out.model, Provider::Llama);
        assert_eq!(out.output, "from secondary");
        assert_eq!(primary.call_count(), 0);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_secondary_failure_falls_back() {
        let (primary, _, router) = clients(MockModelClient::new("llama", |_| {
            Err(LlmError::InvalidResponse("boom".to_string()))
        }));
        let out = router.route_prompt("docker setup").await.unwrap();
        assert_eq!(out.model, Provider::Gemini);
        assert_eq!(out.output, "from primary");
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_secondary_falls_back() {
        let (_, _, router) = clients(MockModelClient::fixed("llama", "   "));
        let out = router.route_prompt("sql schema").await.unwrap();
        assert_eq!(out.model, Provider::Gemini);
    }

    #[tokio::test]
    async fn test_plain_prompt_goes_to_primary() {
        let (_, secondary, router) = clients(MockModelClient::fixed("llama", "x"));
        let out = router.route_prompt("organise a team offsite").await.unwrap();
        assert_eq!(out.model, Provider::Gemini);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_primary_error_propagates() {
        let primary: Arc<dyn ModelClient> = Arc::new(MockModelClient::new("gemini", |_| {
            Err(LlmError::Timeout(std::time::Duration::from_secs(1)))
        }));
        let factory = MockClientFactory::default().with(Provider::Gemini, primary);
        let router = PromptRouter::new(Arc::new(factory), None);
        assert!(router.route_prompt("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_secondary_answers_without_primary() {
        let secondary: Arc<dyn ModelClient> = Arc::new(MockModelClient::fixed("llama", "from secondary"));
        let router = PromptRouter::new(Arc::new(MockClientFactory::default()), Some(secondary));
        let out = router.route_prompt("write the backend").await.unwrap();
        assert_eq!(out.model, Provider::Llama);
        assert_eq!(out.output, "from secondary");
    }

    #[tokio::test]
    async fn test_missing_primary_only_fails_on_fallback() {
        let router = PromptRouter::new(
            Arc::new(MockClientFactory::default()),
            Some(Arc::new(MockModelClient::fixed("llama", "")) as Arc<dyn ModelClient>),
        );
        let err = router.route_prompt("docker setup").await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }
}
