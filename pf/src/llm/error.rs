//! Model client error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a model provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} request failed ({status}): {body}")]
    ApiError { provider: String, status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} provider not configured")]
    NotConfigured(String),

    #[error("{0} environment variable not set")]
    MissingApiKey(String),
}
