//! Ledger Store
//!
//! Capability traits the services are written against, with two backends:
//! - [`PgLedgerStore`]: PostgreSQL, row locks via `SELECT ... FOR UPDATE`
//! - [`MemoryLedgerStore`]: in-process, same locking and constraint semantics
//!
//! Every write happens inside a [`LedgerTx`]. Nothing a transaction does is
//! visible to other callers until [`LedgerTx::commit`] succeeds; dropping a
//! transaction without committing rolls it back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::fund::Fund;
use crate::ownership::CapTableEntry;
use crate::transfer::{Transfer, ValidatedTransfer};
use crate::validation::{Page, PageRequest};

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Constraint and index names shared by both backends
pub mod constraints {
    pub const FUND_NAME_UNIQUE: &str = "funds_name_unique";
    pub const ACTIVE_OWNER_UNIQUE: &str = "cap_table_entries_active_owner";
    pub const IDEMPOTENCY_KEY_UNIQUE: &str = "transfers_idempotency_key_unique";
}

/// Rows removed by [`LedgerStore::reset`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetCounts {
    pub funds: u64,
    pub entries: u64,
    pub transfers: u64,
}

/// Entry point of a ledger backend: opens transactions and serves reads.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Open a new atomic unit of work.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_fund(&self, fund_id: Uuid) -> Result<Option<Fund>, StoreError>;

    /// Funds, newest first.
    async fn list_funds(&self, page: PageRequest) -> Result<Page<Fund>, StoreError>;

    /// The active entry of `owner` in `fund_id`.
    async fn find_entry(
        &self,
        fund_id: Uuid,
        owner: &str,
    ) -> Result<Option<CapTableEntry>, StoreError>;

    /// Active entries of a fund, largest balance first, then by owner name.
    async fn list_entries(
        &self,
        fund_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CapTableEntry>, StoreError>;

    /// Transfers of a fund in the order they were committed.
    async fn list_transfers(
        &self,
        fund_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Transfer>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Delete every fund, entry and transfer.
    async fn reset(&self) -> Result<ResetCounts, StoreError>;
}

/// One open transaction against a ledger backend.
#[async_trait]
pub trait LedgerTx: Send {
    async fn fund_exists(&mut self, fund_id: Uuid) -> Result<bool, StoreError>;

    /// Insert a fund. Fails with a unique violation on
    /// [`constraints::FUND_NAME_UNIQUE`] if the name is taken.
    async fn create_fund(&mut self, fund: &Fund) -> Result<(), StoreError>;

    async fn create_entry(&mut self, entry: &CapTableEntry) -> Result<(), StoreError>;

    /// Exclusively lock the active entries of `owners` until this
    /// transaction ends, acquiring the locks in ascending owner-name order.
    /// Owners without an active entry are skipped. Blocks while another
    /// transaction holds one of the locks, up to the store's lock timeout.
    ///
    /// Returned entries are sorted by owner name.
    async fn lock_entries_for_update(
        &mut self,
        fund_id: Uuid,
        owners: &[&str],
    ) -> Result<Vec<CapTableEntry>, StoreError>;

    /// Exclusively lock the active entry of a single owner.
    async fn lock_entry_for_update(
        &mut self,
        fund_id: Uuid,
        owner: &str,
    ) -> Result<Option<CapTableEntry>, StoreError> {
        let mut locked = self.lock_entries_for_update(fund_id, &[owner]).await?;
        Ok(locked.pop())
    }

    /// Subtract `units` from a locked entry. The caller has already checked
    /// the balance under the lock.
    async fn decrement_balance(&mut self, entry_id: Uuid, units: i32) -> Result<(), StoreError>;

    /// Add `units` to the active entry of `owner`, creating it if missing.
    ///
    /// Like any UPDATE, crediting an existing entry takes its row lock and
    /// waits if another transaction holds it. Callers that may credit an
    /// owner who is also a source elsewhere lock it up front with
    /// [`LedgerTx::lock_entries_for_update`] so lock order stays global.
    async fn increment_or_create(
        &mut self,
        fund_id: Uuid,
        owner: &str,
        units: i32,
    ) -> Result<(), StoreError>;

    async fn find_by_idempotency_key(&mut self, key: Uuid)
    -> Result<Option<Transfer>, StoreError>;

    /// Append the immutable transfer record; the store assigns id and timestamp.
    async fn append_transfer(
        &mut self,
        transfer: &ValidatedTransfer,
    ) -> Result<Transfer, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Roll back a transaction whose outcome is already decided. A failed
/// rollback is only logged: the caller's result stands, and the backend
/// discards the transaction anyway once it is dropped.
pub async fn rollback_or_warn<T: LedgerTx>(tx: T) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Transaction rollback failed");
    }
}
