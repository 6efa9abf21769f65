//! PostgreSQL ledger backend
//!
//! Each [`PgLedgerTx`] wraps one `sqlx::Transaction` with `lock_timeout` set
//! for its lifetime, so a blocked `FOR UPDATE` surfaces as
//! [`StoreError::LockTimeout`] instead of hanging. Dropping an uncommitted
//! transaction rolls it back when the connection returns to the pool.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx, ResetCounts};
use crate::error::StoreError;
use crate::fund::Fund;
use crate::ownership::{CapTableEntry, EntryState};
use crate::transfer::{Transfer, ValidatedTransfer};
use crate::validation::{Page, PageRequest};

const FUND_COLUMNS: &str = "id, name, total_units, created_at";
const ENTRY_COLUMNS: &str = "id, fund_id, owner_name, units, acquired_at, updated_at, deleted_at";
const TRANSFER_COLUMNS: &str =
    "id, fund_id, from_owner, to_owner, units, idempotency_key, transferred_at";

fn row_to_fund(row: &PgRow) -> Result<Fund, StoreError> {
    Ok(Fund {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        total_units: row.try_get("total_units")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_entry(row: &PgRow) -> Result<CapTableEntry, StoreError> {
    Ok(CapTableEntry {
        id: row.try_get("id")?,
        fund_id: row.try_get("fund_id")?,
        owner_name: row.try_get("owner_name")?,
        units: row.try_get("units")?,
        acquired_at: row.try_get("acquired_at")?,
        updated_at: row.try_get("updated_at")?,
        state: EntryState::from_deleted_at(row.try_get("deleted_at")?),
    })
}

fn row_to_transfer(row: &PgRow) -> Result<Transfer, StoreError> {
    Ok(Transfer {
        id: row.try_get("id")?,
        fund_id: row.try_get("fund_id")?,
        from_owner: row.try_get("from_owner")?,
        to_owner: row.try_get("to_owner")?,
        units: row.try_get("units")?,
        idempotency_key: row.try_get("idempotency_key")?,
        transferred_at: row.try_get("transferred_at")?,
    })
}

/// PostgreSQL-backed ledger store
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count(&self, sql: &str, fund_id: Option<Uuid>) -> Result<i64, StoreError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(fund_id) = fund_id {
            query = query.bind(fund_id);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<PgLedgerTx, StoreError> {
        let mut tx = self.pool.begin().await?;
        // SET LOCAL does not take bind parameters; set_config(.., true) is its equivalent
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;
        Ok(PgLedgerTx { tx })
    }

    async fn find_fund(&self, fund_id: Uuid) -> Result<Option<Fund>, StoreError> {
        let row = sqlx::query(&format!("SELECT {FUND_COLUMNS} FROM funds WHERE id = $1"))
            .bind(fund_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_fund).transpose()
    }

    async fn list_funds(&self, page: PageRequest) -> Result<Page<Fund>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {FUND_COLUMNS} FROM funds
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(row_to_fund).collect::<Result<Vec<_>, _>>()?;
        let total = self.count("SELECT COUNT(*) FROM funds", None).await?;
        Ok(Page::new(items, total, page))
    }

    async fn find_entry(
        &self,
        fund_id: Uuid,
        owner: &str,
    ) -> Result<Option<CapTableEntry>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cap_table_entries
             WHERE fund_id = $1 AND owner_name = $2 AND deleted_at IS NULL"
        ))
        .bind(fund_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn list_entries(
        &self,
        fund_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CapTableEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cap_table_entries
             WHERE fund_id = $1 AND deleted_at IS NULL
             ORDER BY units DESC, owner_name ASC
             LIMIT $2 OFFSET $3"
        ))
        .bind(fund_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()?;
        let total = self
            .count(
                "SELECT COUNT(*) FROM cap_table_entries WHERE fund_id = $1 AND deleted_at IS NULL",
                Some(fund_id),
            )
            .await?;
        Ok(Page::new(items, total, page))
    }

    async fn list_transfers(
        &self,
        fund_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Transfer>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers
             WHERE fund_id = $1
             ORDER BY transferred_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        ))
        .bind(fund_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(row_to_transfer)
            .collect::<Result<Vec<_>, _>>()?;
        let total = self
            .count(
                "SELECT COUNT(*) FROM transfers WHERE fund_id = $1",
                Some(fund_id),
            )
            .await?;
        Ok(Page::new(items, total, page))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<ResetCounts, StoreError> {
        let mut tx = self.pool.begin().await?;
        let transfers = sqlx::query("DELETE FROM transfers")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let entries = sqlx::query("DELETE FROM cap_table_entries")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let funds = sqlx::query("DELETE FROM funds")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        Ok(ResetCounts {
            funds,
            entries,
            transfers,
        })
    }
}

/// Open transaction on a [`PgLedgerStore`]
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn fund_exists(&mut self, fund_id: Uuid) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM funds WHERE id = $1)")
            .bind(fund_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn create_fund(&mut self, fund: &Fund) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO funds (id, name, total_units, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(fund.id)
        .bind(&fund.name)
        .bind(fund.total_units)
        .bind(fund.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn create_entry(&mut self, entry: &CapTableEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cap_table_entries
                 (id, fund_id, owner_name, units, acquired_at, updated_at, deleted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id)
        .bind(entry.fund_id)
        .bind(&entry.owner_name)
        .bind(entry.units)
        .bind(entry.acquired_at)
        .bind(entry.updated_at)
        .bind(entry.state.deleted_at())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_entries_for_update(
        &mut self,
        fund_id: Uuid,
        owners: &[&str],
    ) -> Result<Vec<CapTableEntry>, StoreError> {
        let owners: Vec<String> = owners.iter().map(|o| o.to_string()).collect();
        // LockRows sits above the sort, so rows are locked in ORDER BY order
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM cap_table_entries
             WHERE fund_id = $1 AND owner_name = ANY($2) AND deleted_at IS NULL
             ORDER BY owner_name
             FOR UPDATE"
        ))
        .bind(fund_id)
        .bind(&owners)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn decrement_balance(&mut self, entry_id: Uuid, units: i32) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE cap_table_entries SET units = units - $1, updated_at = NOW()
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(units)
        .bind(entry_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!(
                "cap table entry {entry_id} vanished"
            )));
        }
        Ok(())
    }

    async fn increment_or_create(
        &mut self,
        fund_id: Uuid,
        owner: &str,
        units: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cap_table_entries (id, fund_id, owner_name, units, acquired_at, updated_at)
             VALUES ($1, $2, $3, $4, NOW(), NOW())
             ON CONFLICT (fund_id, owner_name) WHERE deleted_at IS NULL
             DO UPDATE SET units = cap_table_entries.units + EXCLUDED.units, updated_at = NOW()",
        )
        .bind(Uuid::new_v4())
        .bind(fund_id)
        .bind(owner)
        .bind(units)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_by_idempotency_key(
        &mut self,
        key: Uuid,
    ) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_transfer).transpose()
    }

    async fn append_transfer(
        &mut self,
        transfer: &ValidatedTransfer,
    ) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transfers (id, fund_id, from_owner, to_owner, units, idempotency_key, transferred_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             RETURNING {TRANSFER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(transfer.fund_id)
        .bind(&transfer.from_owner)
        .bind(&transfer.to_owner)
        .bind(transfer.units)
        .bind(transfer.idempotency_key)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_transfer(&row)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
