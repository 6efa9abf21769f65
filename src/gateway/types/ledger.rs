//! Request and response DTOs for the ledger endpoints
//!
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::fund::Fund;
use crate::ownership::{CapTableEntry, CapTableView};
use crate::store::ResetCounts;
use crate::transfer::Transfer;
use crate::validation::Page;

// ============================================================================
// Requests
// ============================================================================

/// Create a fund with one initial owner holding every unit
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFundRequest {
    #[schema(example = "Growth Fund I")]
    pub name: String,
    #[schema(example = 1000)]
    pub total_units: i64,
    #[schema(example = "Alice")]
    pub initial_owner: String,
}

/// Move units between two owners of the fund in the path
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferRequest {
    #[schema(example = "Alice")]
    pub from_owner: String,
    #[schema(example = "Bob")]
    pub to_owner: String,
    #[schema(example = 200)]
    pub units: i64,
    /// Replaying the same key with the same data returns the original transfer
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundData {
    pub id: Uuid,
    pub name: String,
    pub total_units: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Fund> for FundData {
    fn from(f: Fund) -> Self {
        Self {
            id: f.id,
            name: f.name,
            total_units: f.total_units,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundListData {
    pub items: Vec<FundData>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<Page<Fund>> for FundListData {
    fn from(page: Page<Fund>) -> Self {
        let page = page.map(FundData::from);
        Self {
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// One owner's stake
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipData {
    pub fund_id: Uuid,
    pub owner_name: String,
    pub units: i32,
    pub acquired_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CapTableEntry> for OwnershipData {
    fn from(e: CapTableEntry) -> Self {
        Self {
            fund_id: e.fund_id,
            owner_name: e.owner_name,
            units: e.units,
            acquired_at: e.acquired_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapTableRowData {
    pub owner_name: String,
    pub units: i32,
    /// Share of the fund's total units, 0-100
    #[schema(example = 80.0)]
    pub percentage: f64,
    pub acquired_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapTableData {
    pub fund_id: Uuid,
    pub fund_name: String,
    pub total_units: i32,
    pub entries: Vec<CapTableRowData>,
    /// Active entries in the fund, independent of the page window
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<CapTableView> for CapTableData {
    fn from(view: CapTableView) -> Self {
        let entries = view
            .rows()
            .map(|(e, percentage)| CapTableRowData {
                owner_name: e.owner_name.clone(),
                units: e.units,
                percentage,
                acquired_at: e.acquired_at,
                updated_at: e.updated_at,
            })
            .collect();
        Self {
            fund_id: view.fund_id,
            fund_name: view.fund_name,
            total_units: view.total_units,
            entries,
            total: view.entries.total,
            limit: view.entries.limit,
            offset: view.entries.offset,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub from_owner: String,
    pub to_owner: String,
    pub units: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<Uuid>,
    pub transferred_at: DateTime<Utc>,
}

impl From<Transfer> for TransferData {
    fn from(t: Transfer) -> Self {
        Self {
            id: t.id,
            fund_id: t.fund_id,
            from_owner: t.from_owner,
            to_owner: t.to_owner,
            units: t.units,
            idempotency_key: t.idempotency_key,
            transferred_at: t.transferred_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferListData {
    pub items: Vec<TransferData>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<Page<Transfer>> for TransferListData {
    fn from(page: Page<Transfer>) -> Self {
        let page = page.map(TransferData::from);
        Self {
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Rows removed by a reset
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetData {
    pub funds_deleted: u64,
    pub entries_deleted: u64,
    pub transfers_deleted: u64,
}

impl From<ResetCounts> for ResetData {
    fn from(c: ResetCounts) -> Self {
        Self {
            funds_deleted: c.funds,
            entries_deleted: c.entries,
            transfers_deleted: c.transfers,
        }
    }
}
