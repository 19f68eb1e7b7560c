//! End-to-end pipeline tests: decide, execute, record.

mod common;

use common::*;
use refundguard::error::AppError;
use refundguard::orchestrator::{record_id, HandleOutcome};

fn setup() -> (DbPool, std::sync::Arc<FakeTransport>, RefundOrchestrator<FakeTransport>) {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    seed_tokens(&pool, "creator_1", Some(60 * 60));
    let transport = FakeTransport::new();
    let orchestrator = test_orchestrator(pool.clone(), transport.clone());
    (pool, transport, orchestrator)
}

#[tokio::test]
async fn approved_request_refunds_and_records() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);
    transport.push_ok(200, r#"{"id":"rf_1","status":"refunded"}"#);
    // Membership revocation after the refund.
    transport.push_ok(204, "");

    let request = sample_request("pur_1", 3);
    let outcome = orchestrator.handle("creator_1", &request).await.unwrap();

    let HandleOutcome::Refunded { record, refund } = outcome else {
        panic!("expected a refund");
    };
    assert_eq!(refund["id"], "rf_1");
    assert_eq!(record.decision, Decision::Approved);
    assert_eq!(record.status, RefundStatus::Refunded);
    assert_eq!(record.whop_request_id.as_deref(), Some("rf_1"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].url.ends_with("/purchases/pur_1/refund"));
    assert!(requests[1].url.ends_with("/memberships/mem_test"));

    let conn = pool.get().unwrap();
    let stored = queries::get_refund_log(&conn, &record.id).unwrap().unwrap();
    assert_eq!(stored.status, RefundStatus::Refunded);
    assert_eq!(queries::count_refund_logs(&conn, "creator_1").unwrap(), 1);
}

#[tokio::test]
async fn pending_gateway_status_records_processing() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);
    transport.push_ok(200, r#"{"id":"rf_2","status":"pending"}"#);
    transport.push_ok(204, "");

    let outcome = orchestrator
        .handle("creator_1", &sample_request("pur_2", 1))
        .await
        .unwrap();
    assert_eq!(outcome.record().status, RefundStatus::Processing);
}

#[tokio::test]
async fn denied_request_queues_a_denial_and_skips_the_gateway() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::NoRefund, None, None);

    let outcome = orchestrator
        .handle("creator_1", &sample_request("pur_1", 0))
        .await
        .unwrap();

    let HandleOutcome::Queued { record, template } = outcome else {
        panic!("expected a queued denial");
    };
    assert_eq!(record.decision, Decision::Denied);
    assert_eq!(record.status, RefundStatus::Denied);
    assert!(template.body.contains("no refunds"));
    assert_eq!(transport.request_count(), 0);

    let conn = pool.get().unwrap();
    assert_eq!(queries::count_refund_logs(&conn, "creator_1").unwrap(), 1);
}

#[tokio::test]
async fn custom_policy_denial_includes_condition_text() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(
        &pool,
        "creator_1",
        PolicyKind::Custom,
        Some(30),
        Some("you must have completed the kickoff call"),
    );

    let outcome = orchestrator
        .handle("creator_1", &sample_request("pur_1", 31))
        .await
        .unwrap();

    let HandleOutcome::Queued { template, .. } = outcome else {
        panic!("expected a queued denial");
    };
    assert!(template.body.contains("30 days"));
    assert!(template
        .body
        .contains("you must have completed the kickoff call"));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn missing_policy_denies_by_default() {
    let (_pool, transport, orchestrator) = setup();

    let outcome = orchestrator
        .handle("creator_1", &sample_request("pur_1", 0))
        .await
        .unwrap();
    assert_eq!(outcome.record().decision, Decision::Denied);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn duplicate_event_collapses_onto_one_record() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);

    let mut request = sample_request("pur_1", 2);
    request.event_id = Some("evt_123".to_string());

    transport.push_ok(200, r#"{"id":"rf_1","status":"refunded"}"#);
    transport.push_ok(204, "");
    orchestrator.handle("creator_1", &request).await.unwrap();

    transport.push_ok(200, r#"{"id":"rf_1","status":"refunded"}"#);
    transport.push_ok(204, "");
    orchestrator.handle("creator_1", &request).await.unwrap();

    let conn = pool.get().unwrap();
    assert_eq!(queries::count_refund_logs(&conn, "creator_1").unwrap(), 1);
    let stored = queries::get_refund_log(&conn, "evt_123").unwrap().unwrap();
    assert_eq!(stored.id, "evt_123");
}

#[tokio::test]
async fn gateway_failure_records_an_error_row() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);
    transport.push_ok(422, r#"{"error":"already_refunded"}"#);

    let request = sample_request("pur_1", 2);
    let err = orchestrator.handle("creator_1", &request).await.unwrap_err();
    assert!(matches!(err, AppError::GatewayRejected { status: 422, .. }));

    let conn = pool.get().unwrap();
    let id = record_id("creator_1", &request);
    let stored = queries::get_refund_log(&conn, &id).unwrap().unwrap();
    assert_eq!(stored.decision, Decision::Error);
    assert_eq!(stored.status, RefundStatus::Failed);
    assert!(stored.raw_payload.unwrap().contains("already_refunded"));
}

#[tokio::test]
async fn revoke_failure_does_not_undo_the_refund() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);
    transport.push_ok(200, r#"{"id":"rf_1","status":"refunded"}"#);
    // Revocation fails on every attempt; the refund outcome must stand.
    transport.push_ok(500, "boom");
    transport.push_ok(500, "boom");
    transport.push_ok(500, "boom");

    let outcome = orchestrator
        .handle("creator_1", &sample_request("pur_1", 2))
        .await
        .unwrap();
    assert!(matches!(outcome, HandleOutcome::Refunded { .. }));

    let conn = pool.get().unwrap();
    let stored = queries::get_refund_log(&conn, &outcome.record().id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, RefundStatus::Refunded);
}

#[tokio::test]
async fn ledger_failure_after_refund_still_reports_success() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);
    transport.push_ok(200, r#"{"id":"rf_1","status":"refunded"}"#);
    transport.push_ok(204, "");

    // Break the ledger after the policy is on file: money will move but
    // the record write cannot succeed.
    {
        let conn = pool.get().unwrap();
        conn.execute_batch("DROP TABLE refund_logs").unwrap();
    }

    let outcome = orchestrator
        .handle("creator_1", &sample_request("pur_1", 2))
        .await
        .unwrap();

    let HandleOutcome::Refunded { record, refund } = outcome else {
        panic!("completed refund must not surface as an error");
    };
    assert_eq!(refund["id"], "rf_1");
    assert_eq!(record.status, RefundStatus::Refunded);
    assert_eq!(record.whop_request_id.as_deref(), Some("rf_1"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn request_without_member_skips_revocation() {
    let (pool, transport, orchestrator) = setup();
    seed_policy(&pool, "creator_1", PolicyKind::Windowed, None, None);
    transport.push_ok(200, r#"{"id":"rf_1","status":"refunded"}"#);

    let mut request = sample_request("pur_1", 2);
    request.member_id = None;
    orchestrator.handle("creator_1", &request).await.unwrap();
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn record_id_prefers_the_upstream_event_id() {
    let mut request = sample_request("pur_1", 2);
    request.event_id = Some("evt_42".to_string());
    assert_eq!(record_id("creator_1", &request), "evt_42");
}

#[test]
fn record_id_is_stable_per_creator_and_purchase() {
    let request = sample_request("pur_1", 2);
    let a = record_id("creator_1", &request);
    let b = record_id("creator_1", &request);
    let other_creator = record_id("creator_2", &request);
    let other_purchase = record_id("creator_1", &sample_request("pur_2", 2));

    assert!(a.starts_with("req_"));
    assert_eq!(a, b);
    assert_ne!(a, other_creator);
    assert_ne!(a, other_purchase);
}

#[tokio::test]
async fn status_updates_upsert_without_touching_the_gateway() {
    let (pool, transport, orchestrator) = setup();

    let mut request = sample_request("pur_1", 2);
    request.event_id = Some("evt_upd".to_string());

    let record = orchestrator
        .record_status_update(
            "creator_1",
            &request,
            Decision::Approved,
            RefundStatus::Refunded,
            None,
        )
        .unwrap();
    assert_eq!(record.id, "evt_upd");
    assert_eq!(transport.request_count(), 0);

    let conn = pool.get().unwrap();
    let stored = queries::get_refund_log(&conn, "evt_upd").unwrap().unwrap();
    assert_eq!(stored.status, RefundStatus::Refunded);
}
