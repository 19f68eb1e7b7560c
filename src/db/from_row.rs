//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupted values.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const CREATOR_COLS: &str = "id, whop_id, name, email, created_at, updated_at";

pub const TOKEN_COLS: &str = "creator_id, access_token, refresh_token, expires_at, updated_at";

pub const POLICY_COLS: &str =
    "creator_id, policy_id, custom_days, custom_condition, updated_at";

pub const REFUND_LOG_COLS: &str = "id, creator_id, whop_request_id, purchase_id, purchase_date, days_since_purchase, product_name, member_name, member_email, amount_cents, currency, decision, status, raw_payload, recorded_at, updated_at";

// ============ FromRow Implementations ============

impl FromRow for Creator {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Creator {
            id: row.get(0)?,
            whop_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl FromRow for TokenCredential {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(TokenCredential {
            creator_id: row.get(0)?,
            access_token: row.get(1)?,
            refresh_token: row.get(2)?,
            expires_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl FromRow for PolicyConfig {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PolicyConfig {
            creator_id: row.get(0)?,
            kind: parse_enum(row, 1, "policy_id")?,
            custom_days: row.get(2)?,
            custom_condition: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl FromRow for RefundRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RefundRecord {
            id: row.get(0)?,
            creator_id: row.get(1)?,
            whop_request_id: row.get(2)?,
            purchase_id: row.get(3)?,
            purchase_date: row.get(4)?,
            days_since_purchase: row.get(5)?,
            product_name: row.get(6)?,
            member_name: row.get(7)?,
            member_email: row.get(8)?,
            amount_cents: row.get(9)?,
            currency: row.get(10)?,
            decision: parse_enum(row, 11, "decision")?,
            status: parse_enum(row, 12, "status")?,
            raw_payload: row.get(13)?,
            recorded_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }
}
