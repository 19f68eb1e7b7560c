//! Test utilities and fixtures for RefundGuard integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub use refundguard::db::{init_db, queries, DbPool};
pub use refundguard::gateway::{RetryPolicy, WhopClient};
pub use refundguard::models::*;
pub use refundguard::orchestrator::RefundOrchestrator;
pub use refundguard::token::{OAuthConfig, TokenManager};
pub use refundguard::transport::{HttpRequest, HttpResponse, Transport, TransportError};

pub const TEST_API_BASE: &str = "https://api.test/v2";
pub const TEST_TOKEN_URL: &str = "https://api.test/v2/oauth/token";

/// In-memory pool capped at one connection so every query sees the same
/// database (each pooled in-memory connection would otherwise be separate).
pub fn test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to create test pool");
    {
        let conn = pool.get().expect("Failed to get test connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    pool
}

/// Transport fake that replays a scripted queue of responses and records
/// every request it was asked to send.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: Result<HttpResponse, TransportError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub fn push_ok(&self, status: u16, body: &str) {
        self.push(Ok(response(status, body)));
    }

    pub fn push_network_error(&self, message: &str) {
        self.push(Err(TransportError(message.to_string())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted response left".to_string())))
    }
}

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        retry_after: None,
        body: body.to_string(),
    }
}

pub fn rate_limited(retry_after: Option<u64>) -> HttpResponse {
    HttpResponse {
        status: 429,
        retry_after,
        body: "{\"error\":\"rate_limited\"}".to_string(),
    }
}

pub fn test_token_manager(pool: DbPool, transport: Arc<FakeTransport>) -> TokenManager<FakeTransport> {
    TokenManager::new(
        pool,
        transport,
        OAuthConfig {
            token_url: TEST_TOKEN_URL.to_string(),
            client_id: Some("client_test".to_string()),
            client_secret: Some("secret_test".to_string()),
        },
    )
}

/// Gateway wired to the fake transport with a tiny backoff so retry tests
/// finish quickly.
pub fn test_gateway(
    pool: DbPool,
    transport: Arc<FakeTransport>,
    max_attempts: u32,
) -> WhopClient<FakeTransport> {
    let tokens = test_token_manager(pool, transport.clone());
    WhopClient::new(
        TEST_API_BASE.to_string(),
        transport,
        tokens,
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        },
    )
}

pub fn test_orchestrator(
    pool: DbPool,
    transport: Arc<FakeTransport>,
) -> RefundOrchestrator<FakeTransport> {
    let gateway = test_gateway(pool.clone(), transport, 3);
    RefundOrchestrator::new(pool, gateway, Some("support@refundguard.test".to_string()))
}

pub fn seed_creator(pool: &DbPool, id: &str) -> Creator {
    let conn = pool.get().expect("Failed to get connection");
    queries::upsert_creator(
        &conn,
        &UpsertCreator {
            id: id.to_string(),
            whop_id: Some(format!("whop_{}", id)),
            name: format!("Creator {}", id),
            email: Some(format!("{}@test.local", id)),
        },
    )
    .expect("Failed to seed creator")
}

/// Store a credential pair expiring `expires_in_secs` seconds from now
/// (None = no recorded expiry).
pub fn seed_tokens(pool: &DbPool, creator_id: &str, expires_in_secs: Option<i64>) {
    let conn = pool.get().expect("Failed to get connection");
    queries::save_tokens(
        &conn,
        &SaveTokens {
            creator_id: creator_id.to_string(),
            access_token: "access_old".to_string(),
            refresh_token: Some("refresh_old".to_string()),
            expires_at: expires_in_secs.map(|secs| chrono::Utc::now().timestamp() + secs),
        },
    )
    .expect("Failed to seed tokens");
}

pub fn seed_policy(
    pool: &DbPool,
    creator_id: &str,
    kind: PolicyKind,
    custom_days: Option<i64>,
    custom_condition: Option<&str>,
) -> PolicyConfig {
    let conn = pool.get().expect("Failed to get connection");
    queries::save_policy(
        &conn,
        creator_id,
        &SavePolicy {
            policy_id: kind,
            custom_days,
            custom_condition: custom_condition.map(str::to_string),
        },
    )
    .expect("Failed to seed policy")
}

pub fn sample_request(purchase_id: &str, days_since_purchase: i64) -> RefundRequest {
    RefundRequest {
        purchase_id: purchase_id.to_string(),
        member_id: Some("mem_test".to_string()),
        member_name: Some("Test Member".to_string()),
        member_email: Some("member@test.local".to_string()),
        product_name: Some("Test Product".to_string()),
        amount_cents: Some(4900),
        currency: "USD".to_string(),
        purchase_date: None,
        days_since_purchase,
        event_id: None,
    }
}
