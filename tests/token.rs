//! Token lifecycle tests: proactive refresh, persistence, failure modes.

mod common;

use common::*;
use refundguard::error::AppError;

#[tokio::test]
async fn missing_credential_is_a_hard_error() {
    let pool = test_pool();
    let transport = FakeTransport::new();
    let tokens = test_token_manager(pool, transport.clone());

    let err = tokens.valid_access_token("creator_1").await.unwrap_err();
    assert!(matches!(err, AppError::NoCredential));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn fresh_token_is_returned_without_a_refresh() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    seed_tokens(&pool, "creator_1", Some(10 * 60));

    let transport = FakeTransport::new();
    let tokens = test_token_manager(pool, transport.clone());

    let access = tokens.valid_access_token("creator_1").await.unwrap();
    assert_eq!(access, "access_old");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn token_without_expiry_never_refreshes() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    seed_tokens(&pool, "creator_1", None);

    let transport = FakeTransport::new();
    let tokens = test_token_manager(pool, transport.clone());

    let access = tokens.valid_access_token("creator_1").await.unwrap();
    assert_eq!(access, "access_old");
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn expiring_token_refreshes_and_persists_before_returning() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    // Expires in 4 minutes, inside the 5-minute refresh window.
    seed_tokens(&pool, "creator_1", Some(4 * 60));

    let transport = FakeTransport::new();
    transport.push_ok(
        200,
        r#"{"access_token":"access_new","refresh_token":"refresh_new","expires_in":3600}"#,
    );
    let tokens = test_token_manager(pool.clone(), transport.clone());

    let access = tokens.valid_access_token("creator_1").await.unwrap();
    assert_eq!(access, "access_new");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, TEST_TOKEN_URL);
    let form = requests[0].form.as_ref().unwrap();
    assert!(form.contains(&("grant_type".to_string(), "refresh_token".to_string())));
    assert!(form.contains(&("refresh_token".to_string(), "refresh_old".to_string())));

    let conn = pool.get().unwrap();
    let stored = queries::get_tokens(&conn, "creator_1").unwrap().unwrap();
    assert_eq!(stored.access_token, "access_new");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh_new"));
    assert!(stored.expires_at.unwrap() > chrono::Utc::now().timestamp() + 3000);
}

#[tokio::test]
async fn refresh_keeps_old_refresh_token_when_not_rotated() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    seed_tokens(&pool, "creator_1", Some(60));

    let transport = FakeTransport::new();
    transport.push_ok(200, r#"{"access_token":"access_new","expires_in":3600}"#);
    let tokens = test_token_manager(pool.clone(), transport);

    tokens.valid_access_token("creator_1").await.unwrap();

    let conn = pool.get().unwrap();
    let stored = queries::get_tokens(&conn, "creator_1").unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh_old"));
}

#[tokio::test]
async fn rejected_refresh_surfaces_status_and_body() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    seed_tokens(&pool, "creator_1", Some(60));

    let transport = FakeTransport::new();
    transport.push_ok(400, r#"{"error":"invalid_grant"}"#);
    let tokens = test_token_manager(pool.clone(), transport.clone());

    let err = tokens.valid_access_token("creator_1").await.unwrap_err();
    match err {
        AppError::RefreshFailed { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected RefreshFailed, got {:?}", other),
    }
    assert_eq!(transport.request_count(), 1);

    // The stale credential must not be clobbered by the failed refresh.
    let conn = pool.get().unwrap();
    let stored = queries::get_tokens(&conn, "creator_1").unwrap().unwrap();
    assert_eq!(stored.access_token, "access_old");
}

#[tokio::test]
async fn refresh_without_refresh_token_fails() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    {
        let conn = pool.get().unwrap();
        queries::save_tokens(
            &conn,
            &SaveTokens {
                creator_id: "creator_1".to_string(),
                access_token: "access_old".to_string(),
                refresh_token: None,
                expires_at: Some(chrono::Utc::now().timestamp() + 60),
            },
        )
        .unwrap();
    }

    let transport = FakeTransport::new();
    let tokens = test_token_manager(pool, transport.clone());

    let err = tokens.valid_access_token("creator_1").await.unwrap_err();
    assert!(matches!(err, AppError::RefreshFailed { .. }));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn force_refresh_ignores_stored_expiry() {
    let pool = test_pool();
    seed_creator(&pool, "creator_1");
    seed_tokens(&pool, "creator_1", Some(60 * 60));

    let transport = FakeTransport::new();
    transport.push_ok(200, r#"{"access_token":"access_forced","expires_in":3600}"#);
    let tokens = test_token_manager(pool.clone(), transport);

    let access = tokens.force_refresh("creator_1").await.unwrap();
    assert_eq!(access, "access_forced");

    let conn = pool.get().unwrap();
    let stored = queries::get_tokens(&conn, "creator_1").unwrap().unwrap();
    assert_eq!(stored.access_token, "access_forced");
}
