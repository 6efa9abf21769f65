use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::models::Fund;
use crate::error::{LedgerError, StoreError};
use crate::ownership::CapTableEntry;
use crate::store::{LedgerStore, LedgerTx, constraints, rollback_or_warn};
use crate::validation::{ListParams, Page};

pub struct FundService<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> FundService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a fund whose entire unit count belongs to `initial_owner`.
    ///
    /// Both rows are validated before the transaction opens, then inserted
    /// and committed together.
    pub async fn create_fund_with_initial_owner(
        &self,
        name: &str,
        total_units: i64,
        initial_owner: &str,
    ) -> Result<Fund, LedgerError> {
        let fund = Fund::new(name, total_units)?;
        let entry = CapTableEntry::new(fund.id, initial_owner, total_units)?;

        let mut tx = self.store.begin().await?;
        let inserted = insert_fund(&mut tx, &fund, &entry).await;
        let result = match inserted {
            Ok(()) => tx.commit().await,
            Err(e) => {
                rollback_or_warn(tx).await;
                Err(e)
            }
        };

        match result {
            Ok(()) => {
                info!(
                    fund_id = %fund.id,
                    name = %fund.name,
                    total_units = fund.total_units,
                    initial_owner = %entry.owner_name,
                    "Fund created"
                );
                Ok(fund)
            }
            Err(e) if e.is_unique_violation_of(constraints::FUND_NAME_UNIQUE) => {
                warn!(name = %fund.name, "Fund name already exists");
                Err(LedgerError::DuplicateFundName(fund.name))
            }
            Err(e) => {
                warn!(name = %fund.name, error = %e, "Fund creation failed");
                Err(e.into())
            }
        }
    }

    pub async fn get_fund(&self, fund_id: Uuid) -> Result<Fund, LedgerError> {
        self.store
            .find_fund(fund_id)
            .await?
            .ok_or(LedgerError::FundNotFound(fund_id))
    }

    /// Funds, newest first.
    pub async fn list_funds(&self, params: ListParams) -> Result<Page<Fund>, LedgerError> {
        Ok(self.store.list_funds(params.normalize()).await?)
    }
}

async fn insert_fund<T: LedgerTx>(
    tx: &mut T,
    fund: &Fund,
    entry: &CapTableEntry,
) -> Result<(), StoreError> {
    tx.create_fund(fund).await?;
    tx.create_entry(entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;

    fn service() -> (FundService<MemoryLedgerStore>, Arc<MemoryLedgerStore>) {
        let store = Arc::new(MemoryLedgerStore::new());
        (FundService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_fund_with_initial_owner() {
        let (service, store) = service();

        let fund = service
            .create_fund_with_initial_owner("  Seed Fund ", 1000, " Alice ")
            .await
            .unwrap();

        assert_eq!(fund.name, "Seed Fund");
        assert_eq!(fund.total_units, 1000);
        let entry = store.find_entry(fund.id, "Alice").await.unwrap().unwrap();
        assert_eq!(entry.units, 1000);
        assert!(entry.is_active());
        assert_eq!(service.get_fund(fund.id).await.unwrap(), fund);
    }

    #[tokio::test]
    async fn test_validation_happens_before_io() {
        let (service, store) = service();

        assert_eq!(
            service.create_fund_with_initial_owner("", 10, "Alice").await,
            Err(LedgerError::InvalidFund)
        );
        assert_eq!(
            service.create_fund_with_initial_owner("F", 0, "Alice").await,
            Err(LedgerError::InvalidFund)
        );
        assert_eq!(
            service.create_fund_with_initial_owner("F", 10, "   ").await,
            Err(LedgerError::InvalidOwner)
        );
        assert_eq!(
            store.list_funds(ListParams::default().normalize()).await.unwrap().total,
            0
        );
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let (service, _store) = service();
        service
            .create_fund_with_initial_owner("Alpha", 10, "Alice")
            .await
            .unwrap();

        let err = service
            .create_fund_with_initial_owner(" Alpha", 99, "Bob")
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateFundName("Alpha".into()));
        assert_eq!(err.http_status(), 409);
    }

    #[tokio::test]
    async fn test_get_missing_fund() {
        let (service, _store) = service();
        let id = Uuid::new_v4();
        assert_eq!(service.get_fund(id).await, Err(LedgerError::FundNotFound(id)));
    }

    #[tokio::test]
    async fn test_list_funds_newest_first() {
        let (service, _store) = service();
        for name in ["First", "Second", "Third"] {
            service
                .create_fund_with_initial_owner(name, 1, "Owner")
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let page = service.list_funds(ListParams::new(2, 0)).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "Second"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.limit, 2);
    }
}
