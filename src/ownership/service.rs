use std::sync::Arc;

use uuid::Uuid;

use super::models::{CapTableEntry, CapTableView};
use crate::error::LedgerError;
use crate::store::LedgerStore;
use crate::validation::{ListParams, normalize_name};

/// Read side of the cap table
pub struct OwnershipService<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> OwnershipService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Active entries of a fund, largest holders first.
    pub async fn get_cap_table(
        &self,
        fund_id: Uuid,
        params: ListParams,
    ) -> Result<CapTableView, LedgerError> {
        let fund = self
            .store
            .find_fund(fund_id)
            .await?
            .ok_or(LedgerError::FundNotFound(fund_id))?;
        let entries = self.store.list_entries(fund_id, params.normalize()).await?;

        Ok(CapTableView {
            fund_id: fund.id,
            fund_name: fund.name,
            total_units: fund.total_units,
            entries,
        })
    }

    /// One owner's active entry. The name is trimmed and matched case-sensitively.
    pub async fn get_ownership(
        &self,
        fund_id: Uuid,
        owner: &str,
    ) -> Result<CapTableEntry, LedgerError> {
        let owner = normalize_name(owner).ok_or(LedgerError::InvalidOwner)?;
        if self.store.find_fund(fund_id).await?.is_none() {
            return Err(LedgerError::FundNotFound(fund_id));
        }
        self.store
            .find_entry(fund_id, &owner)
            .await?
            .ok_or(LedgerError::OwnerNotFound { fund_id, owner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fund::FundService;
    use crate::store::MemoryLedgerStore;
    use crate::transfer::{TransferRequest, TransferService};

    #[tokio::test]
    async fn test_cap_table_with_percentages() {
        let store = Arc::new(MemoryLedgerStore::new());
        let fund = FundService::new(store.clone())
            .create_fund_with_initial_owner("Pct", 1000, "Alice")
            .await
            .unwrap();
        TransferService::new(store.clone())
            .execute_transfer(TransferRequest::new(fund.id, "Alice", "Bob", 250))
            .await
            .unwrap();

        let view = OwnershipService::new(store)
            .get_cap_table(fund.id, ListParams::default())
            .await
            .unwrap();

        assert_eq!(view.total_units, 1000);
        assert_eq!(view.fund_name, "Pct");
        let rows: Vec<_> = view
            .rows()
            .map(|(e, pct)| (e.owner_name.clone(), e.units, pct))
            .collect();
        assert_eq!(
            rows,
            vec![("Alice".to_string(), 750, 75.0), ("Bob".to_string(), 250, 25.0)]
        );
    }

    #[tokio::test]
    async fn test_get_ownership() {
        let store = Arc::new(MemoryLedgerStore::new());
        let fund = FundService::new(store.clone())
            .create_fund_with_initial_owner("Own", 10, "Alice")
            .await
            .unwrap();
        let service = OwnershipService::new(store);

        let entry = service.get_ownership(fund.id, "  Alice ").await.unwrap();
        assert_eq!(entry.units, 10);

        assert_eq!(
            service.get_ownership(fund.id, "alice").await,
            Err(LedgerError::OwnerNotFound {
                fund_id: fund.id,
                owner: "alice".into()
            })
        );
        assert_eq!(
            service.get_ownership(fund.id, " ").await,
            Err(LedgerError::InvalidOwner)
        );
        let missing = Uuid::new_v4();
        assert_eq!(
            service.get_ownership(missing, "Alice").await,
            Err(LedgerError::FundNotFound(missing))
        );
    }
}
