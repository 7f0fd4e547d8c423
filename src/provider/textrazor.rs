//! Direct TextRazor client.

use super::{
    build_http_client, error_message, transport_error, AnnotationProvider, ClientConfig,
    ProviderError,
};
use crate::models::{AnnotationResponse, ProviderEnvelope};
use async_trait::async_trait;
use tracing::{debug, info};

/// Client for the TextRazor entity extraction API.
///
/// The API key is injected at construction and never read from the
/// environment by the client itself.
pub struct TextRazorClient {
    endpoint: String,
    api_key: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl TextRazorClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: &ClientConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingCredential)?
            .to_string();

        info!("Initializing TextRazor client for {}", config.endpoint);

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key,
            timeout_seconds: config.timeout_seconds,
            http_client: build_http_client(config)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnnotationProvider for TextRazorClient {
    async fn annotate(&self, text: &str) -> Result<AnnotationResponse, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidInput("Text is required".to_string()));
        }

        debug!("Sending {} bytes to TextRazor", text.len());

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-textrazor-key", &self.api_key)
            .form(&[("text", text), ("extractors", "entities")])
            .send()
            .await
            .map_err(|e| transport_error(e, &self.endpoint, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message: error_message(&body, status.as_u16()),
            });
        }

        let envelope: ProviderEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(envelope.response)
    }

    fn name(&self) -> &str {
        "textrazor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Form, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn config_with_key(endpoint: &str, key: Option<&str>) -> ClientConfig {
        ClientConfig {
            endpoint: endpoint.to_string(),
            api_key: key.map(String::from),
            timeout_seconds: 5,
            ..ClientConfig::default()
        }
    }

    async fn spawn_fake_textrazor() -> String {
        async fn handler(
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> (StatusCode, Json<Value>) {
            let key = headers
                .get("x-textrazor-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if key != "secret" {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"ok": false, "error": "Invalid API key"})),
                );
            }
            if form.get("extractors").map(String::as_str) != Some("entities") {
                return (StatusCode::BAD_REQUEST, Json(json!({"error": "no extractors"})));
            }

            let text = form.get("text").cloned().unwrap_or_default();
            let entities = if text.contains("USA") {
                json!([{
                    "entityId": "United States",
                    "type": ["Country", "Place"],
                    "confidenceScore": 0.98,
                    "matchedText": "USA"
                }])
            } else {
                Value::Null
            };

            (
                StatusCode::OK,
                Json(json!({"ok": true, "response": {"entities": entities}})),
            )
        }

        let app = Router::new().route("/", post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/", addr)
    }

    #[test]
    fn test_missing_credential_fails_construction() {
        let result = TextRazorClient::new(&config_with_key("http://localhost:1/", None));
        assert!(matches!(result, Err(ProviderError::MissingCredential)));

        let result = TextRazorClient::new(&config_with_key("http://localhost:1/", Some("  ")));
        assert!(matches!(result, Err(ProviderError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_locally() {
        let client =
            TextRazorClient::new(&config_with_key("http://127.0.0.1:9/", Some("secret"))).unwrap();
        let err = client.annotate("   ").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidInput(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_annotate_against_fake_service() {
        let endpoint = spawn_fake_textrazor().await;
        let client = TextRazorClient::new(&config_with_key(&endpoint, Some("secret"))).unwrap();

        let response = client.annotate("George Bush was president of USA.").await.unwrap();
        let entities = response.into_entities();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].primary_type(), "Country");
        assert_eq!(entities[0].matched_text, "USA");

        let response = client.annotate("nothing to see").await.unwrap();
        assert!(response.into_entities().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_rejection_keeps_status() {
        let endpoint = spawn_fake_textrazor().await;
        let client = TextRazorClient::new(&config_with_key(&endpoint, Some("wrong"))).unwrap();

        let err = client.annotate("hello").await.unwrap_err();
        match err {
            ProviderError::Upstream { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
