//! Dev-mode demo data so the dashboard has something to show before a real
//! Whop account is connected.

use chrono::{Duration, Utc};

use crate::db::{queries, AppState};
use crate::models::{
    Decision, PolicyKind, RefundRecord, RefundStatus, SavePolicy, UpsertCreator,
};

pub const DEMO_CREATOR_ID: &str = "demo_creator";

/// Seeds a demo creator with a 7-day windowed policy and a couple of
/// historical refund records. Only runs when the database is empty.
pub fn seed_demo_data(state: &AppState) {
    let conn = state
        .db
        .get()
        .expect("Failed to get db connection for seeding");

    let count = queries::count_refund_logs(&conn, DEMO_CREATOR_ID)
        .expect("Failed to count refund logs");
    if count > 0 || queries::get_creator(&conn, DEMO_CREATOR_ID)
        .expect("Failed to look up demo creator")
        .is_some()
    {
        tracing::info!("Database already has demo data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEMO DATA");
    tracing::info!("============================================");

    let creator = queries::upsert_creator(
        &conn,
        &UpsertCreator {
            id: DEMO_CREATOR_ID.to_string(),
            whop_id: None,
            name: "Demo Creator".to_string(),
            email: Some("demo@refundguard.local".to_string()),
        },
    )
    .expect("Failed to create demo creator");

    let policy = queries::save_policy(
        &conn,
        DEMO_CREATOR_ID,
        &SavePolicy {
            policy_id: PolicyKind::Windowed,
            custom_days: None,
            custom_condition: None,
        },
    )
    .expect("Failed to save demo policy");

    tracing::info!("Creator: {} ({})", creator.name, creator.id);
    tracing::info!("Policy: {}", policy.kind.as_str());

    let now = Utc::now();
    let records = [
        demo_record(
            "demo_req_1",
            "pur_demo_alex",
            "Alex Rivera",
            "alex@example.com",
            "Growth Lab Mastermind",
            29700,
            6,
            Decision::Approved,
            RefundStatus::Refunded,
            now - Duration::days(2),
        ),
        demo_record(
            "demo_req_2",
            "pur_demo_jules",
            "Jules Bennett",
            "jules@example.com",
            "Automation Suite Annual",
            149900,
            18,
            Decision::Denied,
            RefundStatus::Denied,
            now - Duration::days(1),
        ),
    ];

    for record in &records {
        queries::upsert_refund_log(&conn, record).expect("Failed to write demo refund record");
        tracing::info!(
            "Refund record: {} / {} ({})",
            record.member_name.as_deref().unwrap_or("unknown"),
            record.product_name.as_deref().unwrap_or("unknown"),
            record.decision.as_str()
        );
    }

    tracing::info!("============================================");
    tracing::info!("DEMO DATA SEEDED SUCCESSFULLY");
    tracing::info!("============================================");
}

#[allow(clippy::too_many_arguments)]
fn demo_record(
    id: &str,
    purchase_id: &str,
    member_name: &str,
    member_email: &str,
    product_name: &str,
    amount_cents: i64,
    days_since_purchase: i64,
    decision: Decision,
    status: RefundStatus,
    recorded_at: chrono::DateTime<Utc>,
) -> RefundRecord {
    let purchased = recorded_at - Duration::days(days_since_purchase);
    RefundRecord {
        id: id.to_string(),
        creator_id: DEMO_CREATOR_ID.to_string(),
        whop_request_id: None,
        purchase_id: purchase_id.to_string(),
        purchase_date: Some(purchased.to_rfc3339()),
        days_since_purchase: Some(days_since_purchase),
        product_name: Some(product_name.to_string()),
        member_name: Some(member_name.to_string()),
        member_email: Some(member_email.to_string()),
        amount_cents: Some(amount_cents),
        currency: "USD".to_string(),
        decision,
        status,
        raw_payload: None,
        recorded_at: recorded_at.timestamp(),
        updated_at: recorded_at.timestamp(),
    }
}
