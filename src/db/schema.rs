use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        -- Creators (sellers) - created on first successful OAuth exchange
        CREATE TABLE IF NOT EXISTS creators (
            id TEXT PRIMARY KEY,
            whop_id TEXT UNIQUE,
            name TEXT NOT NULL,
            email TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- OAuth credentials, one row per creator, upserted on every
        -- exchange and refresh. expires_at NULL = never-expiring token.
        CREATE TABLE IF NOT EXISTS tokens (
            creator_id TEXT PRIMARY KEY REFERENCES creators(id) ON DELETE CASCADE,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            expires_at INTEGER,
            updated_at INTEGER NOT NULL
        );

        -- Refund policies, one row per creator (last write wins)
        CREATE TABLE IF NOT EXISTS policies (
            creator_id TEXT PRIMARY KEY REFERENCES creators(id) ON DELETE CASCADE,
            policy_id TEXT NOT NULL CHECK (policy_id IN ('no_refund', 'windowed', 'custom')),
            custom_days INTEGER,
            custom_condition TEXT,
            updated_at INTEGER NOT NULL
        );

        -- Refund ledger. id is the idempotence key: duplicate webhook
        -- deliveries and retry re-entrancy collapse onto one row via
        -- ON CONFLICT upsert.
        CREATE TABLE IF NOT EXISTS refund_logs (
            id TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL,
            whop_request_id TEXT,
            purchase_id TEXT NOT NULL,
            purchase_date TEXT,
            days_since_purchase INTEGER,
            product_name TEXT,
            member_name TEXT,
            member_email TEXT,
            amount_cents INTEGER,
            currency TEXT NOT NULL DEFAULT 'USD',
            decision TEXT NOT NULL CHECK (decision IN ('approved', 'denied', 'error')),
            status TEXT NOT NULL CHECK (status IN ('pending', 'processing', 'refunded', 'denied', 'failed')),
            raw_payload TEXT,
            recorded_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_refund_logs_creator_time
            ON refund_logs(creator_id, recorded_at DESC);
        CREATE INDEX IF NOT EXISTS idx_refund_logs_purchase
            ON refund_logs(creator_id, purchase_id);
        "#,
    )?;
    Ok(())
}
