use anyhow::{Context, Result};
use sqlx::PgPool;

/// Advisory lock key serializing schema setup across instances ("captable")
const SCHEMA_LOCK_KEY: i64 = 0x6361_7074_6162_6c65;

/// Create the ledger tables, indexes and triggers if they do not exist yet.
///
/// Runs in one transaction behind an advisory lock, so instances starting at
/// the same time take turns. The owner check trigger is only created when
/// missing; an existing one is left alone and `transfers` is not locked.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    let mut tx = pool
        .begin()
        .await
        .context("Failed to open schema transaction")?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .context("Failed to take schema lock")?;

    let steps: [(&str, &str); 8] = [
        ("funds table", CREATE_FUNDS_TABLE),
        ("cap_table_entries table", CREATE_ENTRIES_TABLE),
        ("active owner index", CREATE_ACTIVE_OWNER_INDEX),
        ("cap table order index", CREATE_CAP_TABLE_ORDER_INDEX),
        ("transfers table", CREATE_TRANSFERS_TABLE),
        ("idempotency key index", CREATE_IDEMPOTENCY_KEY_INDEX),
        ("transfer history index", CREATE_TRANSFER_HISTORY_INDEX),
        ("owner check function", CREATE_OWNER_CHECK_FUNCTION),
    ];

    for (what, sql) in steps {
        sqlx::query(sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Schema step failed: {}", what))?;
    }

    let trigger_exists: bool = sqlx::query_scalar(OWNER_CHECK_TRIGGER_EXISTS)
        .fetch_one(&mut *tx)
        .await
        .context("Schema step failed: owner check trigger lookup")?;
    if !trigger_exists {
        sqlx::query(CREATE_OWNER_CHECK_TRIGGER)
            .execute(&mut *tx)
            .await
            .context("Schema step failed: owner check trigger")?;
    }

    tx.commit().await.context("Failed to commit schema")?;

    tracing::info!("Ledger schema initialized successfully");
    Ok(())
}

const CREATE_FUNDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS funds (
    id          UUID PRIMARY KEY,
    name        VARCHAR(255) NOT NULL,
    total_units INTEGER NOT NULL CHECK (total_units > 0),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT funds_name_unique UNIQUE (name)
)
"#;

const CREATE_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cap_table_entries (
    id          UUID PRIMARY KEY,
    fund_id     UUID NOT NULL REFERENCES funds(id) ON DELETE CASCADE,
    owner_name  VARCHAR(255) NOT NULL,
    units       INTEGER NOT NULL CHECK (units >= 0),
    acquired_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at  TIMESTAMPTZ
)
"#;

// Target of ON CONFLICT in the credit upsert
const CREATE_ACTIVE_OWNER_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS cap_table_entries_active_owner
    ON cap_table_entries (fund_id, owner_name)
    WHERE deleted_at IS NULL
"#;

const CREATE_CAP_TABLE_ORDER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS cap_table_entries_fund_units
    ON cap_table_entries (fund_id, units DESC, owner_name)
    WHERE deleted_at IS NULL
"#;

const CREATE_TRANSFERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transfers (
    id              UUID PRIMARY KEY,
    fund_id         UUID NOT NULL REFERENCES funds(id) ON DELETE CASCADE,
    from_owner      VARCHAR(255) NOT NULL,
    to_owner        VARCHAR(255) NOT NULL,
    units           INTEGER NOT NULL CHECK (units > 0),
    idempotency_key UUID,
    transferred_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT transfers_owners_differ CHECK (from_owner <> to_owner)
)
"#;

// Partial: any number of transfers may omit the key
const CREATE_IDEMPOTENCY_KEY_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS transfers_idempotency_key_unique
    ON transfers (idempotency_key)
    WHERE idempotency_key IS NOT NULL
"#;

const CREATE_TRANSFER_HISTORY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS transfers_fund_history
    ON transfers (fund_id, transferred_at, id)
"#;

// A plain FK cannot target the partial unique index, so a trigger checks that
// both owners hold an active entry in the transfer's fund.
const CREATE_OWNER_CHECK_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION transfers_check_owners() RETURNS trigger AS $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM cap_table_entries
        WHERE fund_id = NEW.fund_id AND owner_name = NEW.from_owner AND deleted_at IS NULL
    ) THEN
        RAISE EXCEPTION 'transfer source % has no active entry in fund %', NEW.from_owner, NEW.fund_id
            USING ERRCODE = 'foreign_key_violation';
    END IF;
    IF NOT EXISTS (
        SELECT 1 FROM cap_table_entries
        WHERE fund_id = NEW.fund_id AND owner_name = NEW.to_owner AND deleted_at IS NULL
    ) THEN
        RAISE EXCEPTION 'transfer target % has no active entry in fund %', NEW.to_owner, NEW.fund_id
            USING ERRCODE = 'foreign_key_violation';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#;

const OWNER_CHECK_TRIGGER_EXISTS: &str = r#"
SELECT EXISTS (
    SELECT 1 FROM pg_trigger
    WHERE tgname = 'transfers_owners_active' AND tgrelid = 'transfers'::regclass
)
"#;

const CREATE_OWNER_CHECK_TRIGGER: &str = r#"
CREATE TRIGGER transfers_owners_active
    BEFORE INSERT ON transfers
    FOR EACH ROW EXECUTE FUNCTION transfers_check_owners()
"#;
