//! Policy evaluation.
//!
//! Pure decision logic: maps a creator's configured policy and the facts of
//! a refund request to approve/deny plus a human-readable rationale. No I/O,
//! no side effects.

use crate::models::{Decision, PolicyConfig, PolicyKind, RefundRequest};

/// Fixed window length for the `Windowed` policy.
pub const WINDOWED_REFUND_DAYS: i64 = 7;

/// Label used when no policy is on file.
pub const DEFAULT_WINDOW_LABEL: &str = "the guarantee window";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub decision: Decision,
    pub reason: String,
    /// Window description interpolated into the denial template,
    /// e.g. "7 days" or "no refunds".
    pub window_label: String,
}

/// Evaluate a refund request against a policy.
///
/// A missing policy denies everything: never auto-approve with no policy on
/// file. Day-count boundaries are inclusive (`days == window` approves), and
/// a negative `days_since_purchase` from clock skew is treated as zero.
pub fn evaluate(policy: Option<&PolicyConfig>, request: &RefundRequest) -> Evaluation {
    let days = request.days_since_purchase.max(0);

    let Some(policy) = policy else {
        return Evaluation {
            decision: Decision::Denied,
            reason: "no refund policy on file; denying by default".to_string(),
            window_label: DEFAULT_WINDOW_LABEL.to_string(),
        };
    };

    match policy.kind {
        PolicyKind::NoRefund => Evaluation {
            decision: Decision::Denied,
            reason: "policy does not allow refunds".to_string(),
            window_label: "no refunds".to_string(),
        },
        PolicyKind::Windowed => within_window(days, WINDOWED_REFUND_DAYS),
        PolicyKind::Custom => {
            // Missing or negative day counts collapse to 0: effectively
            // deny-all rather than approve-all.
            let window = policy.custom_days.unwrap_or(0).max(0);
            within_window(days, window)
        }
    }
}

fn within_window(days: i64, window: i64) -> Evaluation {
    let window_label = format!("{} days", window);
    if days <= window {
        Evaluation {
            decision: Decision::Approved,
            reason: format!("{} days since purchase is within the {} window", days, window_label),
            window_label,
        }
    } else {
        Evaluation {
            decision: Decision::Denied,
            reason: format!("{} days since purchase exceeds the {} window", days, window_label),
            window_label,
        }
    }
}
