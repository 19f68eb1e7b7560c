//! Policy evaluation decision tables.

mod common;

use common::*;
use refundguard::policy::{self, Evaluation};

fn config(kind: PolicyKind, custom_days: Option<i64>) -> PolicyConfig {
    PolicyConfig {
        creator_id: "creator_1".to_string(),
        kind,
        custom_days,
        custom_condition: None,
        updated_at: 0,
    }
}

fn decide(policy: Option<&PolicyConfig>, days: i64) -> Evaluation {
    policy::evaluate(policy, &sample_request("pur_1", days))
}

#[test]
fn no_refund_policy_denies_everything() {
    let policy = config(PolicyKind::NoRefund, None);
    for days in [0, 1, 7, 365] {
        let eval = decide(Some(&policy), days);
        assert_eq!(eval.decision, Decision::Denied, "days = {}", days);
    }
    assert_eq!(decide(Some(&policy), 0).window_label, "no refunds");
}

#[test]
fn windowed_policy_approves_inside_seven_days() {
    let policy = config(PolicyKind::Windowed, None);
    for days in 0..=7 {
        let eval = decide(Some(&policy), days);
        assert_eq!(eval.decision, Decision::Approved, "days = {}", days);
    }
}

#[test]
fn windowed_policy_denies_after_seven_days() {
    let policy = config(PolicyKind::Windowed, None);
    for days in [8, 9, 30] {
        let eval = decide(Some(&policy), days);
        assert_eq!(eval.decision, Decision::Denied, "days = {}", days);
    }
}

#[test]
fn windowed_boundary_is_inclusive() {
    let policy = config(PolicyKind::Windowed, None);
    assert_eq!(decide(Some(&policy), 7).decision, Decision::Approved);
    assert_eq!(decide(Some(&policy), 8).decision, Decision::Denied);
    assert_eq!(decide(Some(&policy), 7).window_label, "7 days");
}

#[test]
fn custom_policy_uses_configured_window() {
    let policy = config(PolicyKind::Custom, Some(14));
    assert_eq!(decide(Some(&policy), 14).decision, Decision::Approved);
    assert_eq!(decide(Some(&policy), 15).decision, Decision::Denied);
    assert_eq!(decide(Some(&policy), 15).window_label, "14 days");
}

#[test]
fn custom_policy_without_days_denies_everything() {
    // Missing custom_days collapses to a zero-day window.
    let policy = config(PolicyKind::Custom, None);
    assert_eq!(decide(Some(&policy), 0).decision, Decision::Approved);
    assert_eq!(decide(Some(&policy), 1).decision, Decision::Denied);
}

#[test]
fn negative_custom_days_treated_as_zero() {
    let policy = config(PolicyKind::Custom, Some(-5));
    assert_eq!(decide(Some(&policy), 1).decision, Decision::Denied);
    assert_eq!(decide(Some(&policy), 1).window_label, "0 days");
}

#[test]
fn negative_days_since_purchase_treated_as_zero() {
    // Clock skew can produce a purchase date in the future.
    let policy = config(PolicyKind::Windowed, None);
    assert_eq!(decide(Some(&policy), -3).decision, Decision::Approved);
}

#[test]
fn missing_policy_denies_by_default() {
    let eval = decide(None, 0);
    assert_eq!(eval.decision, Decision::Denied);
    assert!(eval.reason.contains("no refund policy"));
}

#[test]
fn denial_template_includes_custom_condition() {
    let template = refundguard::email::denial_template(
        "14 days",
        Some("a completed onboarding call"),
        Some("help@creator.test"),
    );
    assert!(template.body.contains("14 days"));
    assert!(template.body.contains("a completed onboarding call"));
    assert!(template.body.contains("help@creator.test"));
}

#[test]
fn denial_template_skips_blank_condition() {
    let template = refundguard::email::denial_template("7 days", Some("   "), None);
    assert!(!template.body.contains("Our policy also asks"));
}

#[test]
fn approved_template_mentions_the_payout_timeline() {
    let template = refundguard::email::approved_template();
    assert!(template.subject.contains("Refund processed"));
    assert!(template.body.contains("3-5 business days"));
}
