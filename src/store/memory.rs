//! In-memory ledger backend
//!
//! Committed state sits behind a `std::sync::Mutex` that is never held
//! across an `.await`. Row locks are per-entry `tokio::sync::Mutex`es, so a
//! transaction waiting for a locked entry suspends instead of blocking its
//! worker thread. Crediting an existing entry takes its row lock, as the
//! PostgreSQL upsert does.
//!
//! A transaction records its writes in a journal. `commit` applies the
//! journal to the committed state in one critical section, checking the same
//! constraints the PostgreSQL schema enforces; if any check fails the
//! already-applied writes are undone and nothing becomes visible. Row locks
//! are released only after the new state is in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx, ResetCounts, constraints};
use crate::error::StoreError;
use crate::fund::Fund;
use crate::ownership::{CapTableEntry, EntryState};
use crate::transfer::{Transfer, ValidatedTransfer};
use crate::validation::{Page, PageRequest};

/// Default wait for a row lock before failing with [`StoreError::LockTimeout`]
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct LedgerState {
    funds: HashMap<Uuid, Fund>,
    entries: HashMap<Uuid, CapTableEntry>,
    /// Commit order
    transfers: Vec<Transfer>,
}

#[derive(Debug, Clone)]
enum Write {
    Fund(Fund),
    Entry(CapTableEntry),
    Debit {
        entry_id: Uuid,
        units: i32,
    },
    Credit {
        fund_id: Uuid,
        owner: String,
        units: i32,
    },
    Transfer(Transfer),
}

enum Undo {
    Fund(Uuid),
    Entry(Uuid),
    Units {
        entry_id: Uuid,
        units: i32,
        updated_at: DateTime<Utc>,
    },
    Transfer,
}

fn check_violation(check: &str) -> StoreError {
    StoreError::Unavailable(format!("check constraint violated: {check}"))
}

fn fund_fk_violation(table: &str, fund_id: Uuid) -> StoreError {
    StoreError::Unavailable(format!(
        "foreign key violation on {table}: fund {fund_id} does not exist"
    ))
}

impl LedgerState {
    fn active_entry(&self, fund_id: Uuid, owner: &str) -> Option<&CapTableEntry> {
        self.entries
            .values()
            .find(|e| e.fund_id == fund_id && e.owner_name == owner && e.is_active())
    }

    fn active_entry_id(&self, fund_id: Uuid, owner: &str) -> Option<Uuid> {
        self.active_entry(fund_id, owner).map(|e| e.id)
    }

    fn transfer_by_key(&self, key: Uuid) -> Option<&Transfer> {
        self.transfers
            .iter()
            .find(|t| t.idempotency_key == Some(key))
    }

    fn apply(&mut self, write: Write) -> Result<Undo, StoreError> {
        match write {
            Write::Fund(fund) => {
                if self.funds.contains_key(&fund.id) {
                    return Err(StoreError::unique("funds_pkey"));
                }
                if self.funds.values().any(|f| f.name == fund.name) {
                    return Err(StoreError::unique(constraints::FUND_NAME_UNIQUE));
                }
                let id = fund.id;
                self.funds.insert(id, fund);
                Ok(Undo::Fund(id))
            }
            Write::Entry(entry) => {
                if !self.funds.contains_key(&entry.fund_id) {
                    return Err(fund_fk_violation("cap_table_entries", entry.fund_id));
                }
                if entry.units < 0 {
                    return Err(check_violation("cap_table_entries_units_check"));
                }
                if entry.is_active() && self.active_entry(entry.fund_id, &entry.owner_name).is_some()
                {
                    return Err(StoreError::unique(constraints::ACTIVE_OWNER_UNIQUE));
                }
                let id = entry.id;
                self.entries.insert(id, entry);
                Ok(Undo::Entry(id))
            }
            Write::Debit { entry_id, units } => {
                let entry = self
                    .entries
                    .get_mut(&entry_id)
                    .filter(|e| e.is_active())
                    .ok_or_else(|| {
                        StoreError::Unavailable(format!("cap table entry {entry_id} vanished"))
                    })?;
                let remaining = entry
                    .units
                    .checked_sub(units)
                    .filter(|u| *u >= 0)
                    .ok_or_else(|| check_violation("cap_table_entries_units_check"))?;
                let undo = Undo::Units {
                    entry_id,
                    units: entry.units,
                    updated_at: entry.updated_at,
                };
                entry.units = remaining;
                entry.updated_at = Utc::now();
                Ok(undo)
            }
            Write::Credit {
                fund_id,
                owner,
                units,
            } => {
                if let Some(id) = self.active_entry_id(fund_id, &owner)
                    && let Some(entry) = self.entries.get_mut(&id)
                {
                    let total = entry
                        .units
                        .checked_add(units)
                        .ok_or_else(|| check_violation("cap_table_entries_units_check"))?;
                    let undo = Undo::Units {
                        entry_id: id,
                        units: entry.units,
                        updated_at: entry.updated_at,
                    };
                    entry.units = total;
                    entry.updated_at = Utc::now();
                    return Ok(undo);
                }

                if !self.funds.contains_key(&fund_id) {
                    return Err(fund_fk_violation("cap_table_entries", fund_id));
                }
                let now = Utc::now();
                let entry = CapTableEntry {
                    id: Uuid::new_v4(),
                    fund_id,
                    owner_name: owner,
                    units,
                    acquired_at: now,
                    updated_at: now,
                    state: EntryState::Active,
                };
                let id = entry.id;
                self.entries.insert(id, entry);
                Ok(Undo::Entry(id))
            }
            Write::Transfer(transfer) => {
                if transfer.from_owner == transfer.to_owner {
                    return Err(check_violation("transfers_owners_differ"));
                }
                if transfer.units <= 0 {
                    return Err(check_violation("transfers_units_check"));
                }
                if !self.funds.contains_key(&transfer.fund_id) {
                    return Err(fund_fk_violation("transfers", transfer.fund_id));
                }
                for owner in [&transfer.from_owner, &transfer.to_owner] {
                    if self.active_entry(transfer.fund_id, owner).is_none() {
                        return Err(StoreError::Unavailable(format!(
                            "owner {owner:?} has no active entry in fund {}",
                            transfer.fund_id
                        )));
                    }
                }
                if let Some(key) = transfer.idempotency_key
                    && self.transfer_by_key(key).is_some()
                {
                    return Err(StoreError::unique(constraints::IDEMPOTENCY_KEY_UNIQUE));
                }
                self.transfers.push(transfer);
                Ok(Undo::Transfer)
            }
        }
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Fund(id) => {
                self.funds.remove(&id);
            }
            Undo::Entry(id) => {
                self.entries.remove(&id);
            }
            Undo::Units {
                entry_id,
                units,
                updated_at,
            } => {
                if let Some(entry) = self.entries.get_mut(&entry_id) {
                    entry.units = units;
                    entry.updated_at = updated_at;
                }
            }
            Undo::Transfer => {
                self.transfers.pop();
            }
        }
    }

    /// Apply all writes or none of them.
    fn apply_all(&mut self, journal: Vec<Write>) -> Result<(), StoreError> {
        let mut undo_log = Vec::with_capacity(journal.len());
        for write in journal {
            match self.apply(write) {
                Ok(undo) => undo_log.push(undo),
                Err(e) => {
                    while let Some(undo) = undo_log.pop() {
                        self.revert(undo);
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

struct Shared {
    state: Mutex<LedgerState>,
    row_locks: DashMap<Uuid, Arc<RowLock<()>>>,
    lock_timeout: Duration,
}

impl Shared {
    fn state(&self) -> Result<MutexGuard<'_, LedgerState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger state lock poisoned".to_string()))
    }

    fn row_lock(&self, entry_id: Uuid) -> Arc<RowLock<()>> {
        self.row_locks.entry(entry_id).or_default().value().clone()
    }
}

/// In-process ledger store
#[derive(Clone)]
pub struct MemoryLedgerStore {
    shared: Arc<Shared>,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LedgerState::default()),
                row_locks: DashMap::new(),
                lock_timeout,
            }),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            shared: Arc::clone(&self.shared),
            journal: Vec::new(),
            held: HashMap::new(),
        })
    }

    async fn find_fund(&self, fund_id: Uuid) -> Result<Option<Fund>, StoreError> {
        Ok(self.shared.state()?.funds.get(&fund_id).cloned())
    }

    async fn list_funds(&self, page: PageRequest) -> Result<Page<Fund>, StoreError> {
        let mut funds: Vec<Fund> = self.shared.state()?.funds.values().cloned().collect();
        funds.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(Page::new(page.slice(&funds), funds.len() as i64, page))
    }

    async fn find_entry(
        &self,
        fund_id: Uuid,
        owner: &str,
    ) -> Result<Option<CapTableEntry>, StoreError> {
        Ok(self.shared.state()?.active_entry(fund_id, owner).cloned())
    }

    async fn list_entries(
        &self,
        fund_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CapTableEntry>, StoreError> {
        let mut entries: Vec<CapTableEntry> = self
            .shared
            .state()?
            .entries
            .values()
            .filter(|e| e.fund_id == fund_id && e.is_active())
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.units
                .cmp(&a.units)
                .then_with(|| a.owner_name.cmp(&b.owner_name))
        });
        Ok(Page::new(page.slice(&entries), entries.len() as i64, page))
    }

    async fn list_transfers(
        &self,
        fund_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Transfer>, StoreError> {
        // stored in commit order
        let transfers: Vec<Transfer> = self
            .shared
            .state()?
            .transfers
            .iter()
            .filter(|t| t.fund_id == fund_id)
            .cloned()
            .collect();
        Ok(Page::new(page.slice(&transfers), transfers.len() as i64, page))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.shared.state().map(|_| ())
    }

    async fn reset(&self) -> Result<ResetCounts, StoreError> {
        let counts = {
            let mut state = self.shared.state()?;
            let counts = ResetCounts {
                funds: state.funds.len() as u64,
                entries: state.entries.len() as u64,
                transfers: state.transfers.len() as u64,
            };
            *state = LedgerState::default();
            counts
        };
        self.shared.row_locks.clear();
        Ok(counts)
    }
}

/// Open transaction on a [`MemoryLedgerStore`]
///
/// Dropping it discards the journal and releases every row lock it holds.
pub struct MemoryTx {
    shared: Arc<Shared>,
    journal: Vec<Write>,
    held: HashMap<Uuid, OwnedMutexGuard<()>>,
}

impl MemoryTx {
    /// Take the row lock of `entry_id` unless this transaction already holds it.
    async fn acquire(&mut self, entry_id: Uuid) -> Result<(), StoreError> {
        if self.held.contains_key(&entry_id) {
            return Ok(());
        }
        let lock = self.shared.row_lock(entry_id);
        let guard = tokio::time::timeout(self.shared.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;
        self.held.insert(entry_id, guard);
        Ok(())
    }

    /// Overlay this transaction's pending debits and credits on `entry`.
    fn project(&self, mut entry: CapTableEntry) -> CapTableEntry {
        for write in &self.journal {
            match write {
                Write::Debit { entry_id, units } if *entry_id == entry.id => {
                    entry.units = entry.units.saturating_sub(*units);
                }
                Write::Credit {
                    fund_id,
                    owner,
                    units,
                } if *fund_id == entry.fund_id && *owner == entry.owner_name => {
                    entry.units = entry.units.saturating_add(*units);
                }
                _ => {}
            }
        }
        entry
    }

    fn pending_fund(&self, fund_id: Uuid) -> bool {
        self.journal
            .iter()
            .any(|w| matches!(w, Write::Fund(f) if f.id == fund_id))
    }

    fn pending_entry(&self, fund_id: Uuid, owner: &str) -> Option<&CapTableEntry> {
        self.journal.iter().find_map(|w| match w {
            Write::Entry(e) if e.fund_id == fund_id && e.owner_name == owner && e.is_active() => {
                Some(e)
            }
            _ => None,
        })
    }

    fn pending_credit(&self, fund_id: Uuid, owner: &str) -> bool {
        self.journal.iter().any(|w| {
            matches!(w, Write::Credit { fund_id: f, owner: o, .. } if *f == fund_id && o == owner)
        })
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn fund_exists(&mut self, fund_id: Uuid) -> Result<bool, StoreError> {
        let committed = self.shared.state()?.funds.contains_key(&fund_id);
        Ok(committed || self.pending_fund(fund_id))
    }

    async fn create_fund(&mut self, fund: &Fund) -> Result<(), StoreError> {
        let name_taken = self.shared.state()?.funds.values().any(|f| f.name == fund.name)
            || self
                .journal
                .iter()
                .any(|w| matches!(w, Write::Fund(f) if f.name == fund.name));
        if name_taken {
            return Err(StoreError::unique(constraints::FUND_NAME_UNIQUE));
        }
        self.journal.push(Write::Fund(fund.clone()));
        Ok(())
    }

    async fn create_entry(&mut self, entry: &CapTableEntry) -> Result<(), StoreError> {
        let (fund_known, owner_taken) = {
            let state = self.shared.state()?;
            (
                state.funds.contains_key(&entry.fund_id),
                state.active_entry(entry.fund_id, &entry.owner_name).is_some(),
            )
        };
        if !fund_known && !self.pending_fund(entry.fund_id) {
            return Err(fund_fk_violation("cap_table_entries", entry.fund_id));
        }
        if entry.is_active()
            && (owner_taken || self.pending_entry(entry.fund_id, &entry.owner_name).is_some())
        {
            return Err(StoreError::unique(constraints::ACTIVE_OWNER_UNIQUE));
        }
        self.journal.push(Write::Entry(entry.clone()));
        Ok(())
    }

    async fn lock_entries_for_update(
        &mut self,
        fund_id: Uuid,
        owners: &[&str],
    ) -> Result<Vec<CapTableEntry>, StoreError> {
        let mut owners = owners.to_vec();
        owners.sort_unstable();
        owners.dedup();

        let mut locked = Vec::with_capacity(owners.len());
        for owner in owners {
            let committed_id = self.shared.state()?.active_entry_id(fund_id, owner);
            let Some(entry_id) = committed_id else {
                // Rows inserted by this transaction are invisible to everyone else
                if let Some(pending) = self.pending_entry(fund_id, owner).cloned() {
                    locked.push(self.project(pending));
                }
                continue;
            };

            self.acquire(entry_id).await?;

            // Re-read after the wait: the previous holder may have changed the balance
            let current = self
                .shared
                .state()?
                .entries
                .get(&entry_id)
                .filter(|e| e.is_active())
                .cloned();
            if let Some(entry) = current {
                locked.push(self.project(entry));
            }
        }
        Ok(locked)
    }

    async fn decrement_balance(&mut self, entry_id: Uuid, units: i32) -> Result<(), StoreError> {
        self.journal.push(Write::Debit { entry_id, units });
        Ok(())
    }

    async fn increment_or_create(
        &mut self,
        fund_id: Uuid,
        owner: &str,
        units: i32,
    ) -> Result<(), StoreError> {
        // ON CONFLICT DO UPDATE locks the existing row
        let existing = self.shared.state()?.active_entry_id(fund_id, owner);
        if let Some(entry_id) = existing {
            self.acquire(entry_id).await?;
        }
        self.journal.push(Write::Credit {
            fund_id,
            owner: owner.to_string(),
            units,
        });
        Ok(())
    }

    async fn find_by_idempotency_key(
        &mut self,
        key: Uuid,
    ) -> Result<Option<Transfer>, StoreError> {
        if let Some(t) = self.shared.state()?.transfer_by_key(key) {
            return Ok(Some(t.clone()));
        }
        Ok(self.journal.iter().find_map(|w| match w {
            Write::Transfer(t) if t.idempotency_key == Some(key) => Some(t.clone()),
            _ => None,
        }))
    }

    async fn append_transfer(
        &mut self,
        transfer: &ValidatedTransfer,
    ) -> Result<Transfer, StoreError> {
        if transfer.from_owner == transfer.to_owner {
            return Err(check_violation("transfers_owners_differ"));
        }
        if transfer.units <= 0 {
            return Err(check_violation("transfers_units_check"));
        }

        let (fund_known, from_active, to_active, key_taken) = {
            let state = self.shared.state()?;
            (
                state.funds.contains_key(&transfer.fund_id),
                state
                    .active_entry(transfer.fund_id, &transfer.from_owner)
                    .is_some(),
                state
                    .active_entry(transfer.fund_id, &transfer.to_owner)
                    .is_some(),
                transfer
                    .idempotency_key
                    .is_some_and(|k| state.transfer_by_key(k).is_some()),
            )
        };
        if !fund_known && !self.pending_fund(transfer.fund_id) {
            return Err(fund_fk_violation("transfers", transfer.fund_id));
        }
        for (owner, committed) in [
            (&transfer.from_owner, from_active),
            (&transfer.to_owner, to_active),
        ] {
            let pending = self.pending_entry(transfer.fund_id, owner).is_some()
                || self.pending_credit(transfer.fund_id, owner);
            if !committed && !pending {
                return Err(StoreError::Unavailable(format!(
                    "owner {owner:?} has no active entry in fund {}",
                    transfer.fund_id
                )));
            }
        }
        let key_pending = transfer.idempotency_key.is_some_and(|k| {
            self.journal
                .iter()
                .any(|w| matches!(w, Write::Transfer(t) if t.idempotency_key == Some(k)))
        });
        if key_taken || key_pending {
            return Err(StoreError::unique(constraints::IDEMPOTENCY_KEY_UNIQUE));
        }

        let record = Transfer {
            id: Uuid::new_v4(),
            fund_id: transfer.fund_id,
            from_owner: transfer.from_owner.clone(),
            to_owner: transfer.to_owner.clone(),
            units: transfer.units,
            idempotency_key: transfer.idempotency_key,
            transferred_at: Utc::now(),
        };
        self.journal.push(Write::Transfer(record.clone()));
        Ok(record)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx {
            shared,
            journal,
            held,
        } = self;
        if !journal.is_empty() {
            shared.state()?.apply_all(journal)?;
        }
        // Waiters only see the lock free once the new balances are visible
        drop(held);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
