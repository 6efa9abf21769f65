//! Gateway types module
//!
//! ## Submodules
//! - [`response`]: Response envelope, `ApiError` and error codes
//! - [`ledger`]: Fund, cap table and transfer DTOs

pub mod ledger;
pub mod response;

pub use ledger::{
    CapTableData, CapTableRowData, CreateFundRequest, CreateTransferRequest, FundData,
    FundListData, OwnershipData, ResetData, TransferData, TransferListData,
};
pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
