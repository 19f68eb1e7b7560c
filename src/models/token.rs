use serde::{Deserialize, Serialize};

/// OAuth credential pair for a creator, upserted on every exchange and
/// every refresh. Mutated only by the token manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCredential {
    pub creator_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp. None = token was issued without an explicit lifetime
    /// and is treated as never-expiring.
    pub expires_at: Option<i64>,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct SaveTokens {
    pub creator_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
}
