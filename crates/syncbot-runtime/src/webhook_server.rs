//! GitHub webhook HTTP ingress.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use syncbot_core::{EventOrigin, RelayEngine, ReviewEvent};
use syncbot_github::{
    parse_github_webhook, verify_sha256_hmac_signature, GITHUB_DELIVERY_HEADER,
    GITHUB_EVENT_HEADER, GITHUB_SIGNATURE_HEADER,
};
use tracing::{debug, warn};

pub const DEFAULT_WEBHOOK_PATH: &str = "/api/github/webhooks";

pub struct WebhookServerState {
    pub engine: RelayEngine,
    pub webhook_secret: String,
}

pub fn build_webhook_router(state: Arc<WebhookServerState>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(handle_github_webhook))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
}

async fn handle_github_webhook(
    State(state): State<Arc<WebhookServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let delivery = header_str(&headers, GITHUB_DELIVERY_HEADER).to_string();
    let signature = header_str(&headers, GITHUB_SIGNATURE_HEADER);
    if verify_sha256_hmac_signature(&body, signature, &state.webhook_secret).is_err() {
        warn!(delivery = %delivery, "rejected github webhook with invalid signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(
                json!({"error":{"code":"invalid_signature","message":"github webhook signature verification failed"}}),
            ),
        );
    }

    let event_name = header_str(&headers, GITHUB_EVENT_HEADER).to_string();
    let event = match parse_github_webhook(&event_name, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!(event = %event_name, delivery = %delivery, "github webhook ignored");
            return (StatusCode::ACCEPTED, Json(json!({"status":"ignored"})));
        }
        Err(error) => {
            warn!(
                event = %event_name,
                delivery = %delivery,
                error = %format!("{error:#}"),
                "failed to parse github webhook"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(
                    json!({"error":{"code":"parse_failed","message":"invalid github webhook payload"}}),
                ),
            );
        }
    };

    dispatch_review_event(state.engine.clone(), event, delivery);
    (StatusCode::ACCEPTED, Json(json!({"status":"accepted"})))
}

fn dispatch_review_event(engine: RelayEngine, event: ReviewEvent, delivery: String) {
    tokio::spawn(async move {
        match engine.handle_review_event(&event).await {
            Ok(outcome) => debug!(
                origin = EventOrigin::Review.as_str(),
                delivery = %delivery,
                number = event.number(),
                status = outcome.status(),
                "github event handled"
            ),
            Err(error) => warn!(
                origin = EventOrigin::Review.as_str(),
                delivery = %delivery,
                kind = event.kind(),
                number = event.number(),
                error = %error,
                "github relay failed"
            ),
        }
    });
}
