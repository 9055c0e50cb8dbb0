//! Model routing with ordered provider fallback

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ChatCompletionsClient, GeminiClient, LlmError, ModelClient};
use crate::classifier::Domain;
use crate::config::ProvidersConfig;

/// A model provider the router can hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Llama,
    Local,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Llama => "llama",
            Provider::Local => "local",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of call being routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Planning,
    Execution,
}

/// Cost preference of a call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    #[default]
    Standard,
    Cheap,
}

/// One failed client construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: Provider,
    pub message: String,
}

/// Routing errors
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No provider available. Tried: {} | {}", tried(.attempts), reasons(.attempts))]
    Exhausted { attempts: Vec<ProviderAttempt> },
}

fn tried(attempts: &[ProviderAttempt]) -> String {
    attempts.iter().map(|a| a.provider.as_str()).collect::<Vec<_>>().join(", ")
}

fn reasons(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}:{}", a.provider, a.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds a live client for a provider, or explains why it cannot
pub trait ClientFactory: Send + Sync {
    fn build(&self, provider: Provider) -> Result<Arc<dyn ModelClient>, LlmError>;

    /// Whether the cheap tier may prepend the local provider
    fn local_enabled(&self) -> bool;
}

/// Factory backed by static provider configuration
pub struct ConfigClientFactory {
    providers: ProvidersConfig,
}

impl ConfigClientFactory {
    pub fn new(providers: ProvidersConfig) -> Self {
        Self { providers }
    }
}

impl ClientFactory for ConfigClientFactory {
    fn build(&self, provider: Provider) -> Result<Arc<dyn ModelClient>, LlmError> {
        debug!(%provider, "ConfigClientFactory::build: called");
        match provider {
            Provider::Gemini => Ok(Arc::new(GeminiClient::from_config(&self.providers.gemini)?)),
            Provider::Llama => Ok(Arc::new(ChatCompletionsClient::from_config(
                "llama",
                &self.providers.llama,
            )?)),
            Provider::Local => {
                if !self.providers.local.is_enabled() {
                    return Err(LlmError::NotConfigured("local".to_string()));
                }
                Ok(Arc::new(ChatCompletionsClient::from_config(
                    "local",
                    &self.providers.local.as_chat(),
                )?))
            }
        }
    }

    fn local_enabled(&self) -> bool {
        self.providers.local.is_enabled()
    }
}

/// A client chosen by the router
#[derive(Clone)]
pub struct RoutedModel {
    pub provider: Provider,
    pub client: Arc<dyn ModelClient>,
}

impl std::fmt::Debug for RoutedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedModel")
            .field("provider", &self.provider)
            .field("model", &self.client.model_name())
            .finish()
    }
}

/// Selects a provider per task with a fallback chain
///
/// Holds no per-call state and can be shared across concurrent calls.
pub struct ModelRouter {
    factory: Arc<dyn ClientFactory>,
}

impl ModelRouter {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    /// Router building clients from configuration
    pub fn from_config(providers: &ProvidersConfig) -> Self {
        Self::new(Arc::new(ConfigClientFactory::new(providers.clone())))
    }

    /// Provider preference order for a call
    pub fn route(&self, task_type: TaskType, domain: Domain, cost_tier: CostTier) -> Vec<Provider> {
        let mut strategy = if task_type == TaskType::Planning {
            vec![Provider::Gemini, Provider::Llama]
        } else {
            match domain {
                Domain::Code => vec![Provider::Llama, Provider::Gemini],
                Domain::Devops | Domain::Risk => vec![Provider::Gemini, Provider::Llama],
                _ => vec![Provider::Gemini, Provider::Llama],
            }
        };

        if cost_tier == CostTier::Cheap && self.factory.local_enabled() {
            strategy.insert(0, Provider::Local);
        }

        let mut unique = Vec::with_capacity(strategy.len());
        for provider in strategy {
            if !unique.contains(&provider) {
                unique.push(provider);
            }
        }
        debug!(?task_type, %domain, ?cost_tier, ?unique, "route: called");
        unique
    }

    /// First provider in route order whose client can be built
    pub fn get_model_for_task(
        &self,
        task_type: TaskType,
        domain: Domain,
        cost_tier: CostTier,
    ) -> Result<RoutedModel, RouterError> {
        let providers = self.route(task_type, domain, cost_tier);
        let mut attempts = Vec::new();

        for provider in providers {
            match self.factory.build(provider) {
                Ok(client) => {
                    info!(%provider, model = client.model_name(), ?task_type, %domain, "Routed model");
                    return Ok(RoutedModel { provider, client });
                }
                Err(e) => {
                    warn!(%provider, error = %e, "get_model_for_task: provider unavailable");
                    attempts.push(ProviderAttempt {
                        provider,
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(RouterError::Exhausted { attempts })
    }
}
