//! Whop webhook ingestion.
//!
//! Events are gated on an HMAC-SHA256 signature over the raw request body
//! when a webhook secret is configured; with no secret they pass through
//! unverified. Once an event is durably recorded (or recognized as a
//! duplicate via the ledger upsert), the handler acknowledges with 200 even
//! if downstream execution failed - redelivery must never loop forever.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::db::AppState;
use crate::models::{Decision, RefundRequest, RefundStatus};

type HmacSha256 = Hmac<Sha256>;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/webhooks/whop", post(handle_whop_webhook))
}

/// Verify an HMAC-SHA256 hex signature over the raw body, constant-time.
/// Accepts the bare hex digest or the `sha256=`-prefixed variant.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected.len() != signature.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Build a `RefundRequest` from a webhook payload, plus the creator it
/// belongs to. Returns None when the payload has no purchase reference.
pub fn refund_request_from_event(data: &Value) -> Option<(String, RefundRequest)> {
    let purchase_id = data.get("purchase_id").and_then(Value::as_str)?.to_string();
    let creator_id = data
        .get("creator_id")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    let purchase_date = data
        .pointer("/purchase/created_at")
        .or_else(|| data.get("created_at"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let days_since_purchase = data
        .get("days_since_purchase")
        .and_then(Value::as_i64)
        .or_else(|| {
            // Fall back to deriving the age from the purchase date.
            purchase_date
                .as_deref()
                .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
                .map(|date| (Utc::now() - date.with_timezone(&Utc)).num_days())
        })
        .unwrap_or(0);

    let request = RefundRequest {
        purchase_id,
        member_id: data
            .get("membership_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        member_name: data
            .pointer("/member/name")
            .or_else(|| data.pointer("/member/email"))
            .and_then(Value::as_str)
            .map(str::to_string),
        member_email: data
            .pointer("/member/email")
            .and_then(Value::as_str)
            .map(str::to_string),
        product_name: data
            .pointer("/purchase/product_name")
            .or_else(|| data.pointer("/product/name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        amount_cents: data.get("amount").and_then(Value::as_i64),
        currency: data
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("USD")
            .to_string(),
        purchase_date,
        days_since_purchase,
        event_id: data.get("id").and_then(Value::as_str).map(str::to_string),
    };
    Some((creator_id, request))
}

async fn handle_whop_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get("whop-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !verify_signature(secret, &body, signature) {
            tracing::warn!("webhook rejected: invalid signature");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid_signature" })),
            );
        }
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("webhook rejected: invalid payload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_event" })),
            );
        }
    };

    match event.event_type.as_str() {
        "refund.created" => {
            let Some((creator_id, request)) = refund_request_from_event(&event.data) else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_event" })),
                );
            };
            // Decide and execute. Failures are already recorded in the
            // ledger by the orchestrator; ACK so the platform stops
            // redelivering - a redelivery would hit the same record id.
            if let Err(e) = state.orchestrator.handle(&creator_id, &request).await {
                tracing::error!(
                    "webhook refund handling failed for purchase {}: {}",
                    request.purchase_id,
                    e
                );
            }
        }
        "refund.updated" => {
            let Some((creator_id, request)) = refund_request_from_event(&event.data) else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_event" })),
                );
            };
            // Status update from the platform: record upstream state as-is,
            // no re-evaluation and no gateway call.
            let status = event
                .data
                .get("status")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(RefundStatus::Pending);
            let decision = event
                .data
                .get("decision")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(match status {
                    RefundStatus::Denied => Decision::Denied,
                    RefundStatus::Failed => Decision::Error,
                    _ => Decision::Approved,
                });
            if let Err(e) = state.orchestrator.record_status_update(
                &creator_id,
                &request,
                decision,
                status,
                Some(event.data.to_string()),
            ) {
                tracing::error!("failed to record webhook status update: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal_error" })),
                );
            }
        }
        other => {
            tracing::debug!("ignoring webhook event type {}", other);
        }
    }

    (StatusCode::OK, Json(json!({ "received": true })))
}
