//! Refund orchestration: the decide -> execute -> record pipeline.
//!
//! One invocation per logical refund request. The orchestrator loads the
//! creator's policy, evaluates it, drives the gateway on approval, and
//! always finishes with exactly one ledger upsert per request id. State
//! machine per request:
//!
//! `Received -> Decided{approved|denied} -> (Executing -> Settled|Failed)
//!                                        | (Notifying -> Denied)`

use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::db::{queries, DbPool};
use crate::email::{self, EmailTemplate};
use crate::error::{AppError, Result};
use crate::gateway::WhopClient;
use crate::models::{Decision, RefundRecord, RefundRequest, RefundStatus};
use crate::policy;
use crate::transport::Transport;

/// Outcome surfaced to the HTTP boundary.
#[derive(Debug)]
pub enum HandleOutcome {
    /// Approved and executed against the gateway.
    Refunded {
        record: RefundRecord,
        refund: Value,
    },
    /// Denied; the denial message is queued for delivery.
    Queued {
        record: RefundRecord,
        template: EmailTemplate,
    },
}

impl HandleOutcome {
    pub fn record(&self) -> &RefundRecord {
        match self {
            HandleOutcome::Refunded { record, .. } => record,
            HandleOutcome::Queued { record, .. } => record,
        }
    }
}

pub struct RefundOrchestrator<T: Transport> {
    pool: DbPool,
    gateway: WhopClient<T>,
    support_email: Option<String>,
}

impl<T: Transport> RefundOrchestrator<T> {
    pub fn new(pool: DbPool, gateway: WhopClient<T>, support_email: Option<String>) -> Self {
        Self {
            pool,
            gateway,
            support_email,
        }
    }

    pub fn gateway(&self) -> &WhopClient<T> {
        &self.gateway
    }

    /// Decide and execute one refund request.
    ///
    /// Every branch writes exactly one terminal-state ledger record (via
    /// upsert-by-id) before returning. Gateway failures are recorded as
    /// `decision=error, status=failed` and surfaced to the caller; a ledger
    /// failure after money already moved is logged at the highest severity
    /// but does not turn a completed refund into an error response.
    pub async fn handle(&self, creator_id: &str, request: &RefundRequest) -> Result<HandleOutcome> {
        let policy = {
            let conn = self.pool.get()?;
            queries::get_policy(&conn, creator_id)?
        };

        let evaluation = policy::evaluate(policy.as_ref(), request);
        let record_id = record_id(creator_id, request);

        tracing::info!(
            "refund request {} for purchase {}: {} ({})",
            record_id,
            request.purchase_id,
            evaluation.decision.as_str(),
            evaluation.reason
        );

        if evaluation.decision == Decision::Denied {
            let template = email::denial_template(
                &evaluation.window_label,
                policy.as_ref().and_then(|p| p.custom_condition.as_deref()),
                self.support_email.as_deref(),
            );
            let record = self.build_record(
                creator_id,
                &record_id,
                request,
                Decision::Denied,
                RefundStatus::Denied,
                None,
                Some(json!({ "reason": evaluation.reason }).to_string()),
            );
            self.persist(&record)?;
            return Ok(HandleOutcome::Queued { record, template });
        }

        // Approved: execute against the gateway.
        match self
            .gateway
            .create_refund(creator_id, &request.purchase_id, request.amount_cents)
            .await
        {
            Ok(refund) => {
                // Best-effort revoke; never rolls back or blocks the refund.
                if let Some(member_id) = request.member_id.as_deref() {
                    if let Err(e) = self.gateway.revoke_access(creator_id, member_id).await {
                        tracing::warn!(
                            "revoke_access failed after refund of purchase {}: {}",
                            request.purchase_id,
                            e
                        );
                    }
                }

                let whop_request_id = refund
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let status = match refund.get("status").and_then(Value::as_str) {
                    Some("refunded") => RefundStatus::Refunded,
                    _ => RefundStatus::Processing,
                };
                let record = self.build_record(
                    creator_id,
                    &record_id,
                    request,
                    Decision::Approved,
                    status,
                    whop_request_id,
                    Some(refund.to_string()),
                );

                if let Err(e) = self.persist(&record) {
                    // Money moved but the record did not stick. The refund
                    // outcome still stands; this needs operator attention.
                    tracing::error!(
                        "LEDGER WRITE FAILED after successful refund {} (purchase {}): {}",
                        record_id,
                        request.purchase_id,
                        e
                    );
                }

                Ok(HandleOutcome::Refunded { record, refund })
            }
            Err(gateway_err) => {
                let record = self.build_record(
                    creator_id,
                    &record_id,
                    request,
                    Decision::Error,
                    RefundStatus::Failed,
                    None,
                    Some(json!({ "error": gateway_err.to_string() }).to_string()),
                );
                if let Err(e) = self.persist(&record) {
                    tracing::error!(
                        "failed to record gateway failure for refund {}: {}",
                        record_id,
                        e
                    );
                }
                Err(gateway_err)
            }
        }
    }

    /// Record an upstream status update without re-evaluating or executing.
    /// Used for `refund.updated` webhook events; the upsert-by-id makes a
    /// redelivered event a no-op.
    pub fn record_status_update(
        &self,
        creator_id: &str,
        request: &RefundRequest,
        decision: Decision,
        status: RefundStatus,
        raw_payload: Option<String>,
    ) -> Result<RefundRecord> {
        let record_id = record_id(creator_id, request);
        let record = self.build_record(
            creator_id,
            &record_id,
            request,
            decision,
            status,
            request.event_id.clone(),
            raw_payload,
        );
        self.persist(&record)?;
        Ok(record)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_record(
        &self,
        creator_id: &str,
        record_id: &str,
        request: &RefundRequest,
        decision: Decision,
        status: RefundStatus,
        whop_request_id: Option<String>,
        raw_payload: Option<String>,
    ) -> RefundRecord {
        let now = Utc::now().timestamp();
        RefundRecord {
            id: record_id.to_string(),
            creator_id: creator_id.to_string(),
            whop_request_id,
            purchase_id: request.purchase_id.clone(),
            purchase_date: request.purchase_date.clone(),
            days_since_purchase: Some(request.days_since_purchase),
            product_name: request.product_name.clone(),
            member_name: request.member_name.clone(),
            member_email: request.member_email.clone(),
            amount_cents: request.amount_cents,
            currency: request.currency.clone(),
            decision,
            status,
            raw_payload,
            recorded_at: now,
            updated_at: now,
        }
    }

    fn persist(&self, record: &RefundRecord) -> Result<()> {
        let conn = self.pool.get()?;
        queries::upsert_refund_log(&conn, record)
            .map_err(|e| AppError::LedgerWriteFailed(e.to_string()))
    }
}

/// Stable ledger id for a logical refund request.
///
/// The upstream event id wins when present; otherwise the id is derived
/// from the creator and purchase so a redelivered identical event maps to
/// the same row.
pub fn record_id(creator_id: &str, request: &RefundRequest) -> String {
    if let Some(event_id) = &request.event_id {
        return event_id.clone();
    }
    let mut hasher = Sha256::new();
    hasher.update(creator_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(request.purchase_id.as_bytes());
    format!("req_{}", hex::encode(&hasher.finalize()[..16]))
}
