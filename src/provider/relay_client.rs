//! Client for a relay endpoint that forwards lines to TextRazor.

use super::{
    build_http_client, error_message, transport_error, AnnotationProvider, ClientConfig,
    ProviderError, RELAY_ANALYZE_PATH,
};
use crate::models::{AnnotationResponse, ProviderEnvelope};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

/// Provider that posts `{ "text": ... }` to a relay's analyze route.
///
/// The relay holds the TextRazor credential, so this client needs none.
pub struct RelayClient {
    url: String,
    name: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl RelayClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ProviderError> {
        let url = analyze_url(&config.endpoint);
        info!("Using relay endpoint {}", url);

        Ok(Self {
            name: format!("relay ({})", url),
            url,
            timeout_seconds: config.timeout_seconds,
            http_client: build_http_client(config)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Resolve the analyze route from a relay base URL.
fn analyze_url(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(RELAY_ANALYZE_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, RELAY_ANALYZE_PATH)
    }
}

#[async_trait]
impl AnnotationProvider for RelayClient {
    async fn annotate(&self, text: &str) -> Result<AnnotationResponse, ProviderError> {
        debug!("Posting line to relay {}", self.url);

        let response = self
            .http_client
            .post(&self.url)
            .json(&AnalyzeRequest { text })
            .send()
            .await
            .map_err(|e| transport_error(e, &self.url, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body, status.as_u16());
            return Err(if status == reqwest::StatusCode::BAD_REQUEST {
                ProviderError::InvalidInput(message)
            } else {
                ProviderError::Upstream {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let envelope: ProviderEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(envelope.response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
