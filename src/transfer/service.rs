//! Transfer Service
//!
//! Executes transfers and serves transfer history.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{Replay, Transfer, TransferRequest, ValidatedTransfer};
use crate::error::{LedgerError, StoreError};
use crate::store::{LedgerStore, LedgerTx, constraints, rollback_or_warn};
use crate::validation::{ListParams, Page};

/// What a transaction body decided, before commit
enum Applied {
    /// Balances moved and a new record was appended; must be committed
    New(Transfer),
    /// Identical request already committed; nothing was written
    Replayed(Transfer),
}

pub struct TransferService<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> TransferService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Move `units` from one owner to another within a fund.
    ///
    /// Either the debit, the credit and the transfer record all commit, or
    /// none of them do. Replaying a request with the same idempotency key
    /// returns the original record without touching balances.
    pub async fn execute_transfer(&self, request: TransferRequest) -> Result<Transfer, LedgerError> {
        // 1. Stateless validation
        let transfer = request.validate()?;

        // 2. Transaction
        let mut tx = self.store.begin().await?;

        match apply_transfer(&mut tx, &transfer).await {
            Ok(Applied::New(record)) => {
                if let Err(e) = tx.commit().await {
                    return self.resolve_failure(&transfer, e.into()).await;
                }
                info!(
                    transfer_id = %record.id,
                    fund_id = %record.fund_id,
                    from_owner = %record.from_owner,
                    to_owner = %record.to_owner,
                    units = record.units,
                    "Transfer committed"
                );
                Ok(record)
            }
            Ok(Applied::Replayed(existing)) => {
                rollback_or_warn(tx).await;
                info!(
                    transfer_id = %existing.id,
                    idempotency_key = ?existing.idempotency_key,
                    "Transfer already committed - returning existing record (idempotent)"
                );
                Ok(existing)
            }
            Err(e) => {
                rollback_or_warn(tx).await;
                self.resolve_failure(&transfer, e).await
            }
        }
    }

    /// A concurrent request with the same key can commit between our lookup
    /// and our insert. The unique index then rejects our record; look the
    /// winner up and treat an identical one as a replay.
    async fn resolve_failure(
        &self,
        transfer: &ValidatedTransfer,
        err: LedgerError,
    ) -> Result<Transfer, LedgerError> {
        let key_race = matches!(
            &err,
            LedgerError::StoreUnavailable(e) if e.is_unique_violation_of(constraints::IDEMPOTENCY_KEY_UNIQUE)
        );
        let Some(key) = transfer.idempotency_key.filter(|_| key_race) else {
            log_failure(transfer, &err);
            return Err(err);
        };

        let mut tx = self.store.begin().await?;
        let existing = tx.find_by_idempotency_key(key).await;
        rollback_or_warn(tx).await;

        match transfer.classify_replay(existing?) {
            Replay::Matches(existing) => {
                info!(
                    transfer_id = %existing.id,
                    idempotency_key = %key,
                    "Concurrent identical transfer won the race - returning its record"
                );
                Ok(existing)
            }
            _ => {
                let err = LedgerError::DuplicateIdempotencyKey;
                log_failure(transfer, &err);
                Err(err)
            }
        }
    }

    /// Transfer history of a fund, oldest first.
    pub async fn list_transfers(
        &self,
        fund_id: Uuid,
        params: ListParams,
    ) -> Result<Page<Transfer>, LedgerError> {
        if self.store.find_fund(fund_id).await?.is_none() {
            return Err(LedgerError::FundNotFound(fund_id));
        }
        Ok(self.store.list_transfers(fund_id, params.normalize()).await?)
    }
}

/// Steps 3-8 of a transfer, all inside `tx`. The caller commits or rolls back.
async fn apply_transfer<T: LedgerTx>(
    tx: &mut T,
    transfer: &ValidatedTransfer,
) -> Result<Applied, LedgerError> {
    // 3. Idempotency check
    if let Some(key) = transfer.idempotency_key {
        match transfer.classify_replay(tx.find_by_idempotency_key(key).await?) {
            Replay::Fresh => {}
            Replay::Matches(existing) => return Ok(Applied::Replayed(existing)),
            Replay::Conflicts(existing) => {
                warn!(
                    idempotency_key = %key,
                    existing_transfer_id = %existing.id,
                    "Idempotency key reused with different transfer data"
                );
                return Err(LedgerError::DuplicateIdempotencyKey);
            }
        }
    }

    // 4. Lock source and, if it exists, destination in owner-name order.
    // The credit below would lock an existing destination anyway; taking
    // both here keeps every transfer acquiring locks in one global order.
    let locked = tx
        .lock_entries_for_update(
            transfer.fund_id,
            &[transfer.from_owner.as_str(), transfer.to_owner.as_str()],
        )
        .await?;
    let Some(source) = locked
        .into_iter()
        .find(|e| e.owner_name == transfer.from_owner)
    else {
        if !tx.fund_exists(transfer.fund_id).await? {
            return Err(LedgerError::FundNotFound(transfer.fund_id));
        }
        return Err(LedgerError::OwnerNotFound {
            fund_id: transfer.fund_id,
            owner: transfer.from_owner.clone(),
        });
    };

    // 5. Sufficiency under the lock
    if source.units < transfer.units {
        return Err(LedgerError::InsufficientUnits {
            available: source.units,
            requested: transfer.units,
        });
    }

    // 6. Debit source
    tx.decrement_balance(source.id, transfer.units).await?;

    // 7. Credit target (atomic upsert; an existing row is already ours)
    tx.increment_or_create(transfer.fund_id, &transfer.to_owner, transfer.units)
        .await?;

    // 8. Record transfer
    let record = tx.append_transfer(transfer).await?;
    debug!(transfer_id = %record.id, "Transfer record appended");

    Ok(Applied::New(record))
}

fn log_failure(transfer: &ValidatedTransfer, err: &LedgerError) {
    match err {
        LedgerError::StoreUnavailable(StoreError::LockTimeout) => warn!(
            fund_id = %transfer.fund_id,
            from_owner = %transfer.from_owner,
            "Transfer aborted: source entry lock wait timed out"
        ),
        LedgerError::StoreUnavailable(e) => warn!(
            fund_id = %transfer.fund_id,
            from_owner = %transfer.from_owner,
            to_owner = %transfer.to_owner,
            units = transfer.units,
            error = %e,
            "Transfer aborted by store failure"
        ),
        _ => debug!(
            fund_id = %transfer.fund_id,
            from_owner = %transfer.from_owner,
            to_owner = %transfer.to_owner,
            units = transfer.units,
            code = err.code(),
            "Transfer rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fund::FundService;
    use crate::store::MemoryLedgerStore;

    async fn setup(total: i64) -> (TransferService<MemoryLedgerStore>, Arc<MemoryLedgerStore>, Uuid) {
        let store = Arc::new(MemoryLedgerStore::new());
        let fund = FundService::new(store.clone())
            .create_fund_with_initial_owner("Test Fund", total, "Alice")
            .await
            .unwrap();
        (TransferService::new(store.clone()), store, fund.id)
    }

    async fn units_of(store: &MemoryLedgerStore, fund_id: Uuid, owner: &str) -> Option<i32> {
        store
            .find_entry(fund_id, owner)
            .await
            .unwrap()
            .map(|e| e.units)
    }

    #[tokio::test]
    async fn test_transfer_creates_destination() {
        let (service, store, fund_id) = setup(1000).await;

        let record = service
            .execute_transfer(TransferRequest::new(fund_id, "Alice", "Bob", 200))
            .await
            .unwrap();

        assert_eq!(record.units, 200);
        assert_eq!(record.from_owner, "Alice");
        assert_eq!(record.to_owner, "Bob");
        assert_eq!(units_of(&store, fund_id, "Alice").await, Some(800));
        assert_eq!(units_of(&store, fund_id, "Bob").await, Some(200));
    }

    #[tokio::test]
    async fn test_full_balance_leaves_zero_row() {
        let (service, store, fund_id) = setup(50).await;

        service
            .execute_transfer(TransferRequest::new(fund_id, "Alice", "Bob", 50))
            .await
            .unwrap();

        assert_eq!(units_of(&store, fund_id, "Alice").await, Some(0));
        assert_eq!(units_of(&store, fund_id, "Bob").await, Some(50));
    }

    #[tokio::test]
    async fn test_unknown_fund_vs_unknown_owner() {
        let (service, _store, fund_id) = setup(10).await;

        let missing = Uuid::new_v4();
        let err = service
            .execute_transfer(TransferRequest::new(missing, "Alice", "Bob", 1))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::FundNotFound(missing));

        let err = service
            .execute_transfer(TransferRequest::new(fund_id, "Carol", "Bob", 1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::OwnerNotFound {
                fund_id,
                owner: "Carol".into()
            }
        );
    }

    #[tokio::test]
    async fn test_trimmed_names_are_stored() {
        let (service, store, fund_id) = setup(10).await;

        let record = service
            .execute_transfer(TransferRequest::new(fund_id, " Alice ", "  Bob", 3))
            .await
            .unwrap();

        assert_eq!(record.from_owner, "Alice");
        assert_eq!(record.to_owner, "Bob");
        assert_eq!(units_of(&store, fund_id, "Bob").await, Some(3));
    }

    #[tokio::test]
    async fn test_insufficient_reports_balance() {
        let (service, _store, fund_id) = setup(10).await;

        let err = service
            .execute_transfer(TransferRequest::new(fund_id, "Alice", "Bob", 11))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientUnits {
                available: 10,
                requested: 11
            }
        );
    }

    #[tokio::test]
    async fn test_lock_timeout_is_retryable() {
        let store = Arc::new(MemoryLedgerStore::with_lock_timeout(
            std::time::Duration::from_millis(50),
        ));
        let fund = FundService::new(store.clone())
            .create_fund_with_initial_owner("Locked", 10, "Alice")
            .await
            .unwrap();
        let service = TransferService::new(store.clone());

        let mut holder = store.begin().await.unwrap();
        holder.lock_entry_for_update(fund.id, "Alice").await.unwrap();

        let err = service
            .execute_transfer(TransferRequest::new(fund.id, "Alice", "Bob", 1))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::StoreUnavailable(StoreError::LockTimeout));
        assert!(err.is_retryable());
        assert_eq!(units_of(&store, fund.id, "Alice").await, Some(10));
    }

    #[tokio::test]
    async fn test_existing_destination_is_locked_before_debit() {
        let store = Arc::new(MemoryLedgerStore::with_lock_timeout(
            std::time::Duration::from_millis(50),
        ));
        let fund = FundService::new(store.clone())
            .create_fund_with_initial_owner("Both Locked", 10, "Alice")
            .await
            .unwrap();
        let service = TransferService::new(store.clone());
        service
            .execute_transfer(TransferRequest::new(fund.id, "Alice", "Bob", 1))
            .await
            .unwrap();

        let mut holder = store.begin().await.unwrap();
        holder.lock_entry_for_update(fund.id, "Bob").await.unwrap();

        let err = service
            .execute_transfer(TransferRequest::new(fund.id, "Alice", "Bob", 1))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::StoreUnavailable(StoreError::LockTimeout));

        // the failed attempt released Alice again
        holder.rollback().await.unwrap();
        service
            .execute_transfer(TransferRequest::new(fund.id, "Alice", "Bob", 1))
            .await
            .unwrap();
        assert_eq!(units_of(&store, fund.id, "Alice").await, Some(8));
        assert_eq!(units_of(&store, fund.id, "Bob").await, Some(2));
    }

    #[tokio::test]
    async fn test_list_transfers_unknown_fund() {
        let (service, _store, _fund_id) = setup(10).await;
        let missing = Uuid::new_v4();
        assert_eq!(
            service
                .list_transfers(missing, ListParams::default())
                .await
                .unwrap_err(),
            LedgerError::FundNotFound(missing)
        );
    }
}
