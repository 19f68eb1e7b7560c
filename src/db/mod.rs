mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::gateway::{RetryPolicy, WhopClient};
use crate::orchestrator::RefundOrchestrator;
use crate::session::SessionKeys;
use crate::token::{OAuthConfig, TokenManager};
use crate::transport::ReqwestTransport;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Orchestrator wired to the real HTTP transport, as used by the server.
pub type LiveOrchestrator = RefundOrchestrator<ReqwestTransport>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub session: SessionKeys,
    pub orchestrator: Arc<LiveOrchestrator>,
}

impl AppState {
    /// Wire up the live token manager, gateway client and orchestrator.
    pub fn new(db: DbPool, config: Config) -> Self {
        let transport = Arc::new(ReqwestTransport::new());
        let tokens = TokenManager::new(
            db.clone(),
            transport.clone(),
            OAuthConfig {
                token_url: config.whop_token_url.clone(),
                client_id: config.whop_client_id.clone(),
                client_secret: config.whop_client_secret.clone(),
            },
        );
        let gateway = WhopClient::new(
            config.whop_api_base.clone(),
            transport,
            tokens,
            RetryPolicy::default(),
        );
        let orchestrator = Arc::new(RefundOrchestrator::new(
            db.clone(),
            gateway,
            config.support_email.clone(),
        ));
        let session = SessionKeys::new(&config.session_secret);

        Self {
            db,
            config,
            session,
            orchestrator,
        }
    }
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
