//! Relay endpoint.
//!
//! Exposes `POST /api/analyze` so clients can annotate text without holding
//! the TextRazor credential. The body is `{ "text": "..." }`; the answer is
//! the provider envelope `{ "response": { "entities": [...] } }` or
//! `{ "error": "..." }` with a 4xx/5xx status.

use crate::models::ProviderEnvelope;
use crate::provider::{AnnotationProvider, ErrorClass, ProviderError, RELAY_ANALYZE_PATH};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const TEXT_REQUIRED: &str = "Text is required";

/// Shared state of the relay.
#[derive(Clone)]
struct RelayState {
    provider: Arc<dyn AnnotationProvider>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Build the relay router around `provider`.
pub fn router(provider: Arc<dyn AnnotationProvider>) -> Router {
    Router::new()
        .route(RELAY_ANALYZE_PATH, post(analyze_handler))
        .with_state(RelayState { provider })
}

/// Bind `listen` and serve the relay until the process stops.
pub async fn serve(listen: &str, provider: Arc<dyn AnnotationProvider>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind relay to {}", listen))?;
    let addr = listener
        .local_addr()
        .context("Failed to read relay address")?;

    info!(
        "🚀 Relay forwarding to {} on http://{}{}",
        provider.name(),
        addr,
        RELAY_ANALYZE_PATH
    );

    axum::serve(listener, router(provider))
        .await
        .context("Relay server stopped unexpectedly")?;

    Ok(())
}

async fn analyze_handler(
    State(state): State<RelayState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let text = match payload {
        Ok(Json(AnalyzeRequest { text: Some(text) })) if !text.trim().is_empty() => text,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, TEXT_REQUIRED),
        Err(rejection) => {
            debug!("Rejected relay body: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, TEXT_REQUIRED);
        }
    };

    debug!("Relaying {} bytes", text.len());

    match state.provider.annotate(&text).await {
        Ok(response) => Json(ProviderEnvelope { response }).into_response(),
        Err(e) => {
            match e.class() {
                ErrorClass::Validation => debug!("Relay rejected input: {}", e),
                ErrorClass::Upstream => {
                    warn!("Relay call to {} failed: {}", state.provider.name(), e)
                }
            }
            provider_error_response(&e)
        }
    }
}

fn provider_error_response(error: &ProviderError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match error {
        ProviderError::InvalidInput(message) => message.clone(),
        ProviderError::Upstream { message, .. } => message.clone(),
        other => other.to_string(),
    };
    error_response(status, &message)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
