use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
    /// Approved but the gateway call failed. Distinguishable from `Denied`
    /// so the dashboard can prompt a retry instead of a final denial.
    Error,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Denied => "denied",
            Decision::Error => "error",
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "denied" => Ok(Decision::Denied),
            "error" => Ok(Decision::Error),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Processing,
    Refunded,
    Denied,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Processing => "processing",
            RefundStatus::Refunded => "refunded",
            RefundStatus::Denied => "denied",
            RefundStatus::Failed => "failed",
        }
    }

    /// Terminal states are never overwritten by the orchestrator returning.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefundStatus::Refunded | RefundStatus::Denied | RefundStatus::Failed
        )
    }
}

impl std::str::FromStr for RefundStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RefundStatus::Pending),
            "processing" => Ok(RefundStatus::Processing),
            "refunded" => Ok(RefundStatus::Refunded),
            "denied" => Ok(RefundStatus::Denied),
            "failed" => Ok(RefundStatus::Failed),
            _ => Err(()),
        }
    }
}

/// A refund request in flight. Transient - consumed once by the orchestrator
/// to produce exactly one `RefundRecord`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundRequest {
    pub purchase_id: String,
    /// Membership to revoke after an approved refund (best-effort).
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub member_name: Option<String>,
    #[serde(default)]
    pub member_email: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    /// Amount in minor currency units. None = full refund.
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub days_since_purchase: i64,
    /// Upstream request/webhook id. When present it becomes the record id,
    /// which is what makes duplicate deliveries idempotent.
    #[serde(default)]
    pub event_id: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Durable record of one refund decision and its outcome.
/// `id` is the idempotence key: a second write with the same id updates the
/// row in place instead of duplicating it.
#[derive(Debug, Clone, Serialize)]
pub struct RefundRecord {
    pub id: String,
    pub creator_id: String,
    /// Refund id assigned by the payment platform, when one exists.
    pub whop_request_id: Option<String>,
    pub purchase_id: String,
    pub purchase_date: Option<String>,
    pub days_since_purchase: Option<i64>,
    pub product_name: Option<String>,
    pub member_name: Option<String>,
    pub member_email: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: String,
    pub decision: Decision,
    pub status: RefundStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<String>,
    pub recorded_at: i64,
    pub updated_at: i64,
}
