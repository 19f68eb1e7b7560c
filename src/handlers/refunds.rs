//! Refund endpoints: the user-initiated decide-and-execute entry point,
//! the ledger listing for the dashboard, and the purchases proxy.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{queries, AppState};
use crate::email;
use crate::error::{AppError, Result};
use crate::models::RefundRequest;
use crate::orchestrator::HandleOutcome;
use crate::session::CreatorSession;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/refund-requests", get(list_refund_requests))
        .route("/api/purchases", get(list_purchases))
        .route("/api/process-refund", post(process_refund))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list_refund_requests(
    State(state): State<AppState>,
    CreatorSession(creator_id): CreatorSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let conn = state.db.get()?;
    let logs = queries::list_refund_logs(&conn, &creator_id, limit)?;
    Ok(Json(json!({ "source": "persisted", "data": logs })))
}

#[derive(Debug, Deserialize)]
struct PurchasesQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_purchases(
    State(state): State<AppState>,
    CreatorSession(creator_id): CreatorSession,
    Query(query): Query<PurchasesQuery>,
) -> Result<Json<Value>> {
    let purchases = state
        .orchestrator
        .gateway()
        .fetch_purchases(
            &creator_id,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(50),
            &[],
        )
        .await?;
    Ok(Json(json!({ "source": "whop", "data": purchases })))
}

/// Run one refund request through the orchestrator and map the outcome to
/// the HTTP shape: approved -> `{status: "success", refund, template}`, denied ->
/// `{status: "queued", template}`. Gateway failures surface as typed errors.
async fn process_refund(
    State(state): State<AppState>,
    CreatorSession(creator_id): CreatorSession,
    Json(request): Json<RefundRequest>,
) -> Result<Json<Value>> {
    if request.purchase_id.trim().is_empty() {
        return Err(AppError::BadRequest("purchase_id is required".into()));
    }

    match state.orchestrator.handle(&creator_id, &request).await? {
        HandleOutcome::Refunded { record, refund } => Ok(Json(json!({
            "status": "success",
            "refund": refund,
            "record": record,
            "template": email::approved_template(),
        }))),
        HandleOutcome::Queued { record, template } => Ok(Json(json!({
            "status": "queued",
            "template": template,
            "record": record,
        }))),
    }
}
