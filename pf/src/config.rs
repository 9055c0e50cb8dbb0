//! planforge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::orchestrator::FailurePolicy;

/// Main planforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Model provider configuration
    pub providers: ProvidersConfig,

    /// Orchestration behavior
    pub orchestrator: OrchestratorConfig,

    /// Telemetry history bounds
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// At least one provider must be able to produce a client, otherwise every
    /// routed call would fail. Call this early in startup to fail fast.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        let gemini_ready = std::env::var(&self.providers.gemini.api_key_env).is_ok();
        let llama_ready = self.providers.llama.is_enabled();
        let local_ready = self.providers.local.is_enabled();
        if !(gemini_ready || llama_ready || local_ready) {
            return Err(eyre::eyre!(
                "No model provider available. Set {} or configure the llama/local provider.",
                self.providers.gemini.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .planforge.yml
        let local_config = PathBuf::from(".planforge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/planforge/planforge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planforge").join("planforge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed: a broken config file is reported properly by
    /// [`Config::load`] once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(p) => p.clone(),
            None => {
                let local = PathBuf::from(".planforge.yml");
                if local.exists() {
                    local
                } else {
                    dirs::config_dir()?.join("planforge").join("planforge.yml")
                }
            }
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// All model providers known to the router
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Primary hosted provider
    pub gemini: GeminiConfig,

    /// Chat-completions provider preferred for code-heavy work
    pub llama: ChatProviderConfig,

    /// Low-cost local provider, only used for the cheap tier
    pub local: LocalProviderConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// HTTP timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Configuration for an OpenAI-style chat-completions provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatProviderConfig {
    /// Explicitly enable the provider
    pub enabled: bool,

    /// Full chat-completions URL
    pub endpoint: String,

    /// Environment variable overriding the endpoint
    #[serde(rename = "endpoint-env")]
    pub endpoint_env: String,

    /// Environment variable containing the API key (may be unset)
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Model identifier
    pub model: String,

    /// Environment variable overriding the model
    #[serde(rename = "model-env")]
    pub model_env: String,

    /// Sampling temperature sent with every request
    pub temperature: Option<f32>,

    /// HTTP timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ChatProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:8000/v1/chat/completions".to_string(),
            endpoint_env: "LLAMA_ENDPOINT".to_string(),
            api_key_env: "LLAMA_API_KEY".to_string(),
            model: "llama-3".to_string(),
            model_env: "LLAMA_MODEL".to_string(),
            temperature: None,
            timeout_ms: 20_000,
        }
    }
}

impl ChatProviderConfig {
    /// Enabled explicitly, or implicitly by setting the key or endpoint env var
    pub fn is_enabled(&self) -> bool {
        self.enabled || env_set(&self.api_key_env) || env_set(&self.endpoint_env)
    }

    /// Endpoint with the environment override applied
    pub fn resolved_endpoint(&self) -> String {
        std::env::var(&self.endpoint_env)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.endpoint.clone())
    }

    /// Model with the environment override applied
    pub fn resolved_model(&self) -> String {
        std::env::var(&self.model_env)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.model.clone())
    }

    /// API key, empty when unset
    pub fn api_key(&self) -> String {
        std::env::var(&self.api_key_env).unwrap_or_default()
    }
}

/// Local model provider configuration
///
/// Disabled unless switched on explicitly or `LOCAL_MODEL_ENDPOINT` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalProviderConfig {
    pub enabled: bool,

    /// Full chat-completions URL of the local server
    pub endpoint: String,

    #[serde(rename = "endpoint-env")]
    pub endpoint_env: String,

    pub model: String,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            endpoint_env: "LOCAL_MODEL_ENDPOINT".to_string(),
            model: "local".to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl LocalProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled || env_set(&self.endpoint_env)
    }

    /// View as a chat-completions provider so the same adapter serves both
    pub fn as_chat(&self) -> ChatProviderConfig {
        ChatProviderConfig {
            enabled: self.enabled,
            endpoint: self.endpoint.clone(),
            endpoint_env: self.endpoint_env.clone(),
            api_key_env: String::new(),
            model: self.model.clone(),
            model_env: String::new(),
            temperature: None,
            timeout_ms: self.timeout_ms,
        }
    }
}

fn env_set(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

/// Orchestration behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// What an executor failure does to the batch
    #[serde(rename = "failure-policy")]
    pub failure_policy: FailurePolicy,

    /// Per model call timeout in milliseconds (0 disables)
    #[serde(rename = "call-timeout-ms")]
    pub call_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::FailFast,
            call_timeout_ms: 120_000,
        }
    }
}

/// Telemetry history bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Main event log capacity
    #[serde(rename = "max-events")]
    pub max_events: usize,

    /// Task progress timeline capacity
    #[serde(rename = "max-timeline")]
    pub max_timeline: usize,

    /// Risk event capacity
    #[serde(rename = "max-risk-events")]
    pub max_risk_events: usize,

    /// Reallocation event capacity
    #[serde(rename = "max-reallocations")]
    pub max_reallocations: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_timeline: 500,
            max_risk_events: 200,
            max_reallocations: 100,
        }
    }
}
