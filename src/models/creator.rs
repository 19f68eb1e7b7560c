use serde::{Deserialize, Serialize};

/// A creator (seller) identity, created on first successful OAuth exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    /// Platform-side user id, when the profile endpoint returned one.
    pub whop_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpsertCreator {
    pub id: String,
    pub whop_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
}
