//! ModelClient trait definition

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::LlmError;

/// Uniform text-in, text-out interface every provider adapter satisfies
///
/// Each call is independent; no conversation state is kept between calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a prompt and return the model's text response
    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError>;

    /// Provider-facing model name, for logs
    fn model_name(&self) -> &str;
}

/// Bounds every call of the wrapped client by a deadline
pub struct TimeoutClient {
    inner: Arc<dyn ModelClient>,
    timeout: Duration,
}

impl TimeoutClient {
    pub fn new(inner: Arc<dyn ModelClient>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Wrap `inner` unless the timeout is zero
    pub fn wrap(inner: Arc<dyn ModelClient>, timeout: Duration) -> Arc<dyn ModelClient> {
        if timeout.is_zero() {
            inner
        } else {
            Arc::new(Self::new(inner, timeout))
        }
    }
}

#[async_trait]
impl ModelClient for TimeoutClient {
    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(model = self.inner.model_name(), timeout_ms = self.timeout.as_millis() as u64, "TimeoutClient::generate_content: called");
        match tokio::time::timeout(self.timeout, self.inner.generate_content(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                debug!("TimeoutClient::generate_content: deadline elapsed");
                Err(LlmError::Timeout(self.timeout))
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
