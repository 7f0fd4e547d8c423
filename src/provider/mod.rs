//! Annotation providers.
//!
//! An annotation provider takes one line of text and returns the entities
//! detected in it. The TextRazor client talks to the NER service directly;
//! the relay client goes through a relay endpoint that holds the
//! credential. Both are wrapped by the retry adapter before use.

pub mod relay_client;
pub mod retry;
pub mod textrazor;

pub use relay_client::RelayClient;
pub use retry::Retrying;
pub use textrazor::TextRazorClient;

use crate::models::AnnotationResponse;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Default TextRazor endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.textrazor.com/";

/// Path of the analyze route on a relay endpoint.
pub const RELAY_ANALYZE_PATH: &str = "/api/analyze";

/// Broad classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was rejected (4xx-equivalent).
    Validation,
    /// The provider, its configuration or the transport failed (5xx-equivalent).
    Upstream,
}

/// Failure of a single annotation call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("TEXTRAZOR_API_KEY not set")]
    MissingCredential,

    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::InvalidInput(_) => ErrorClass::Validation,
            _ => ErrorClass::Upstream,
        }
    }

    /// HTTP status an endpoint should answer with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            ProviderError::InvalidInput(_) => 400,
            ProviderError::MissingCredential => 500,
            ProviderError::Upstream { status, .. } => *status,
            ProviderError::Transport(_) => 502,
            ProviderError::Timeout(_) => 504,
            ProviderError::Decode(_) => 502,
        }
    }

    /// Whether repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProviderError::InvalidInput(_) | ProviderError::MissingCredential
        )
    }
}

/// Settings shared by the HTTP-backed providers.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_seconds: 30,
            user_agent: format!("nerlens/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Something that annotates one line of text with entities.
#[async_trait]
pub trait AnnotationProvider: Send + Sync {
    async fn annotate(&self, text: &str) -> Result<AnnotationResponse, ProviderError>;

    /// Short name used in logs and report metadata.
    fn name(&self) -> &str;
}

#[async_trait]
impl<P: AnnotationProvider + ?Sized> AnnotationProvider for Box<P> {
    async fn annotate(&self, text: &str) -> Result<AnnotationResponse, ProviderError> {
        (**self).annotate(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<P: AnnotationProvider + ?Sized> AnnotationProvider for Arc<P> {
    async fn annotate(&self, text: &str) -> Result<AnnotationResponse, ProviderError> {
        (**self).annotate(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the HTTP client used by the providers.
fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Map a reqwest send error onto the provider taxonomy.
fn transport_error(error: reqwest::Error, endpoint: &str, timeout_seconds: u64) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout_seconds)
    } else if error.is_connect() {
        ProviderError::Transport(format!("Cannot connect to {}", endpoint))
    } else {
        ProviderError::Transport(format!("Failed to send request: {}", error))
    }
}

/// Extract a readable message from an error body.
///
/// Understands `{"error": "..."}` bodies; anything else is returned trimmed.
fn error_message(body: &str, status: u16) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| match json.get("error") {
            Some(serde_json::Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        });

    match parsed {
        Some(message) => message,
        None if body.trim().is_empty() => format!("HTTP {}", status),
        None => body.trim().to_string(),
    }
}
