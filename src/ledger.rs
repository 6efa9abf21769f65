//! Ledger facade
//!
//! [`Ledger`] wires the fund, ownership and transfer services to one store.
//! The HTTP layer talks to it through the object-safe [`LedgerApi`] so the
//! backend is chosen at startup rather than at compile time.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{LedgerError, StoreError};
use crate::fund::{Fund, FundService};
use crate::ownership::{CapTableEntry, CapTableView, OwnershipService};
use crate::store::{LedgerStore, ResetCounts};
use crate::transfer::{Transfer, TransferRequest, TransferService};
use crate::validation::{ListParams, Page};

#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn create_fund(
        &self,
        name: &str,
        total_units: i64,
        initial_owner: &str,
    ) -> Result<Fund, LedgerError>;

    async fn get_fund(&self, fund_id: Uuid) -> Result<Fund, LedgerError>;

    async fn list_funds(&self, params: ListParams) -> Result<Page<Fund>, LedgerError>;

    async fn get_cap_table(
        &self,
        fund_id: Uuid,
        params: ListParams,
    ) -> Result<CapTableView, LedgerError>;

    async fn get_ownership(&self, fund_id: Uuid, owner: &str)
    -> Result<CapTableEntry, LedgerError>;

    async fn execute_transfer(&self, request: TransferRequest) -> Result<Transfer, LedgerError>;

    async fn list_transfers(
        &self,
        fund_id: Uuid,
        params: ListParams,
    ) -> Result<Page<Transfer>, LedgerError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn reset(&self) -> Result<ResetCounts, StoreError>;
}

pub struct Ledger<S> {
    store: Arc<S>,
    funds: FundService<S>,
    ownership: OwnershipService<S>,
    transfers: TransferService<S>,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            funds: FundService::new(store.clone()),
            ownership: OwnershipService::new(store.clone()),
            transfers: TransferService::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerApi for Ledger<S> {
    async fn create_fund(
        &self,
        name: &str,
        total_units: i64,
        initial_owner: &str,
    ) -> Result<Fund, LedgerError> {
        self.funds
            .create_fund_with_initial_owner(name, total_units, initial_owner)
            .await
    }

    async fn get_fund(&self, fund_id: Uuid) -> Result<Fund, LedgerError> {
        self.funds.get_fund(fund_id).await
    }

    async fn list_funds(&self, params: ListParams) -> Result<Page<Fund>, LedgerError> {
        self.funds.list_funds(params).await
    }

    async fn get_cap_table(
        &self,
        fund_id: Uuid,
        params: ListParams,
    ) -> Result<CapTableView, LedgerError> {
        self.ownership.get_cap_table(fund_id, params).await
    }

    async fn get_ownership(
        &self,
        fund_id: Uuid,
        owner: &str,
    ) -> Result<CapTableEntry, LedgerError> {
        self.ownership.get_ownership(fund_id, owner).await
    }

    async fn execute_transfer(&self, request: TransferRequest) -> Result<Transfer, LedgerError> {
        self.transfers.execute_transfer(request).await
    }

    async fn list_transfers(
        &self,
        fund_id: Uuid,
        params: ListParams,
    ) -> Result<Page<Transfer>, LedgerError> {
        self.transfers.list_transfers(fund_id, params).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }

    async fn reset(&self) -> Result<ResetCounts, StoreError> {
        let counts = self.store.reset().await?;
        tracing::warn!(
            funds = counts.funds,
            entries = counts.entries,
            transfers = counts.transfers,
            "Ledger reset: all data deleted"
        );
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;

    #[tokio::test]
    async fn test_ledger_behind_trait_object() {
        let ledger: Arc<dyn LedgerApi> = Arc::new(Ledger::new(MemoryLedgerStore::new()));

        let fund = ledger.create_fund("Dyn", 100, "Alice").await.unwrap();
        ledger
            .execute_transfer(TransferRequest::new(fund.id, "Alice", "Bob", 40))
            .await
            .unwrap();

        let history = ledger
            .list_transfers(fund.id, ListParams::default())
            .await
            .unwrap();
        assert_eq!(history.total, 1);
        assert_eq!(ledger.get_ownership(fund.id, "Bob").await.unwrap().units, 40);
        assert!(ledger.health_check().await.is_ok());

        let counts = ledger.reset().await.unwrap();
        assert_eq!(counts.funds, 1);
        assert_eq!(counts.entries, 2);
        assert_eq!(counts.transfers, 1);
        assert_eq!(
            ledger.get_fund(fund.id).await,
            Err(LedgerError::FundNotFound(fund.id))
        );
    }
}
