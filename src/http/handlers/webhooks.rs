use crate::gateways::{WebhookError, WebhookParse};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

pub async fn receive(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let adapter = match state.adapter(&provider) {
        Some(a) => a,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"received": false, "error": "unknown provider"})),
            )
                .into_response();
        }
    };

    match adapter.parse_webhook(&body, &headers) {
        Ok(WebhookParse::Event(event)) => match state.reconciliation.apply(&event).await {
            Ok(applied) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "received": true,
                    "duplicate": applied.duplicate,
                })),
            )
                .into_response(),
            // only a resource-layer failure reaches here; the provider should retry
            Err(e) => {
                warn!(provider = %provider, error = %e, "webhook reconciliation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"received": false})),
                )
                    .into_response()
            }
        },
        Ok(WebhookParse::Ignored(reason)) => (
            StatusCode::OK,
            Json(serde_json::json!({"received": true, "ignored": reason})),
        )
            .into_response(),
        // malformed or unsigned payloads are audited and acknowledged; a non-2xx
        // here would only make the provider redeliver something we will not use
        Err(WebhookError::InvalidSignature) => {
            warn!(provider = %provider, "webhook rejected: invalid signature");
            (
                StatusCode::OK,
                Json(serde_json::json!({"received": true, "ignored": "invalid signature"})),
            )
                .into_response()
        }
        Err(WebhookError::Unparseable(detail)) => {
            warn!(provider = %provider, detail = %detail, "webhook rejected: unparseable");
            (
                StatusCode::OK,
                Json(serde_json::json!({"received": true, "ignored": "unparseable payload"})),
            )
                .into_response()
        }
    }
}
