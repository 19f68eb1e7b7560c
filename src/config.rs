use std::env;

pub const DEFAULT_API_BASE: &str = "https://api.whop.com/v2";
pub const DEFAULT_TOKEN_URL: &str = "https://api.whop.com/v2/oauth/token";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://whop.com/oauth";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub whop_client_id: Option<String>,
    pub whop_client_secret: Option<String>,
    pub whop_redirect_uri: Option<String>,
    pub whop_api_base: String,
    pub whop_token_url: String,
    pub whop_authorize_url: String,
    /// HMAC secret for webhook signature verification.
    /// When unset, webhook events pass through unverified.
    pub webhook_secret: Option<String>,
    pub session_secret: String,
    pub support_email: Option<String>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("REFUNDGUARD_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(4000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "refundguard.db".to_string()),
            base_url,
            whop_client_id: env::var("WHOP_CLIENT_ID").ok(),
            whop_client_secret: env::var("WHOP_CLIENT_SECRET").ok(),
            whop_redirect_uri: env::var("WHOP_REDIRECT_URI").ok(),
            whop_api_base: env::var("WHOP_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            whop_token_url: env::var("WHOP_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            whop_authorize_url: env::var("WHOP_AUTHORIZE_URL")
                .unwrap_or_else(|_| DEFAULT_AUTHORIZE_URL.to_string()),
            webhook_secret: env::var("WHOP_WEBHOOK_SECRET").ok(),
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "refundguard-secret".to_string()),
            support_email: env::var("SUPPORT_EMAIL").ok(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
