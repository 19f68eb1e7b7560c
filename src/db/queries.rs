use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    query_all, query_one, CREATOR_COLS, POLICY_COLS, REFUND_LOG_COLS, TOKEN_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Creators ============

/// Insert-or-update a creator, keyed by id. Called on every OAuth exchange.
pub fn upsert_creator(conn: &Connection, input: &UpsertCreator) -> Result<Creator> {
    let now = now();
    conn.execute(
        "INSERT INTO creators (id, whop_id, name, email, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(id) DO UPDATE SET
             whop_id = excluded.whop_id,
             name = excluded.name,
             email = excluded.email,
             updated_at = excluded.updated_at",
        params![&input.id, &input.whop_id, &input.name, &input.email, now],
    )?;

    get_creator(conn, &input.id)?.ok_or_else(|| {
        crate::error::AppError::Internal(format!("creator {} missing after upsert", input.id))
    })
}

pub fn get_creator(conn: &Connection, id: &str) -> Result<Option<Creator>> {
    query_one(
        conn,
        &format!("SELECT {} FROM creators WHERE id = ?1", CREATOR_COLS),
        &[&id],
    )
}

// ============ Tokens ============

/// Insert-or-update the credential pair for a creator. Called on every
/// OAuth exchange and every refresh.
pub fn save_tokens(conn: &Connection, input: &SaveTokens) -> Result<()> {
    conn.execute(
        "INSERT INTO tokens (creator_id, access_token, refresh_token, expires_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(creator_id) DO UPDATE SET
             access_token = excluded.access_token,
             refresh_token = excluded.refresh_token,
             expires_at = excluded.expires_at,
             updated_at = excluded.updated_at",
        params![
            &input.creator_id,
            &input.access_token,
            &input.refresh_token,
            &input.expires_at,
            now()
        ],
    )?;
    Ok(())
}

pub fn get_tokens(conn: &Connection, creator_id: &str) -> Result<Option<TokenCredential>> {
    query_one(
        conn,
        &format!("SELECT {} FROM tokens WHERE creator_id = ?1", TOKEN_COLS),
        &[&creator_id],
    )
}

// ============ Policies ============

/// Insert-or-update the refund policy for a creator (last write wins).
pub fn save_policy(conn: &Connection, creator_id: &str, input: &SavePolicy) -> Result<PolicyConfig> {
    let now = now();
    conn.execute(
        "INSERT INTO policies (creator_id, policy_id, custom_days, custom_condition, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(creator_id) DO UPDATE SET
             policy_id = excluded.policy_id,
             custom_days = excluded.custom_days,
             custom_condition = excluded.custom_condition,
             updated_at = excluded.updated_at",
        params![
            creator_id,
            input.policy_id.as_str(),
            &input.custom_days,
            &input.custom_condition,
            now
        ],
    )?;

    Ok(PolicyConfig {
        creator_id: creator_id.to_string(),
        kind: input.policy_id,
        custom_days: input.custom_days,
        custom_condition: input.custom_condition.clone(),
        updated_at: now,
    })
}

pub fn get_policy(conn: &Connection, creator_id: &str) -> Result<Option<PolicyConfig>> {
    query_one(
        conn,
        &format!("SELECT {} FROM policies WHERE creator_id = ?1", POLICY_COLS),
        &[&creator_id],
    )
}

// ============ Refund ledger ============

/// Insert-or-update a refund record, keyed by id.
///
/// This single atomic upsert is what absorbs duplicate webhook deliveries
/// and retry re-entrancy: a second write with the same id updates the
/// decision/status/payload in place and preserves the original recorded_at.
pub fn upsert_refund_log(conn: &Connection, record: &RefundRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO refund_logs (
             id, creator_id, whop_request_id, purchase_id, purchase_date,
             days_since_purchase, product_name, member_name, member_email,
             amount_cents, currency, decision, status, raw_payload,
             recorded_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(id) DO UPDATE SET
             whop_request_id = excluded.whop_request_id,
             purchase_date = excluded.purchase_date,
             days_since_purchase = excluded.days_since_purchase,
             product_name = excluded.product_name,
             decision = excluded.decision,
             status = excluded.status,
             raw_payload = excluded.raw_payload,
             updated_at = excluded.updated_at",
        params![
            &record.id,
            &record.creator_id,
            &record.whop_request_id,
            &record.purchase_id,
            &record.purchase_date,
            &record.days_since_purchase,
            &record.product_name,
            &record.member_name,
            &record.member_email,
            &record.amount_cents,
            &record.currency,
            record.decision.as_str(),
            record.status.as_str(),
            &record.raw_payload,
            &record.recorded_at,
            &record.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_refund_log(conn: &Connection, id: &str) -> Result<Option<RefundRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM refund_logs WHERE id = ?1", REFUND_LOG_COLS),
        &[&id],
    )
}

/// List a creator's refund records, newest first.
pub fn list_refund_logs(
    conn: &Connection,
    creator_id: &str,
    limit: i64,
) -> Result<Vec<RefundRecord>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM refund_logs WHERE creator_id = ?1
             ORDER BY recorded_at DESC, updated_at DESC LIMIT ?2",
            REFUND_LOG_COLS
        ),
        &[&creator_id, &limit],
    )
}

pub fn count_refund_logs(conn: &Connection, creator_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM refund_logs WHERE creator_id = ?1",
        [creator_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}
