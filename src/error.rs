//! Ledger Error Types
//!
//! `LedgerError` is the one failure a caller sees per operation.
//! `StoreError` is what a ledger backend reports; the services translate it.

use thiserror::Error;
use uuid::Uuid;

use crate::validation::{MAX_NAME_LENGTH, MAX_UNITS};

/// SQLSTATE: unique_violation
const PG_UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE: lock_not_available (raised by `lock_timeout`)
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE: query_canceled (raised by `statement_timeout`)
const PG_QUERY_CANCELED: &str = "57014";
/// SQLSTATE: serialization_failure
const PG_SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE: deadlock_detected
const PG_DEADLOCK_DETECTED: &str = "40P01";

/// Backend failure reported by a ledger store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Waiting for a row lock exceeded the configured timeout
    #[error("lock wait timed out")]
    LockTimeout,

    /// The transaction was aborted by the backend and may succeed if re-run
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// Connectivity loss or any other backend error
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    /// True when the unique violation was raised by the named constraint.
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }

    /// Transient failures a caller may choose to retry with the same input.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::LockTimeout | StoreError::Aborted(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.code().as_deref() {
                Some(PG_UNIQUE_VIOLATION) => {
                    return StoreError::unique(db_err.constraint().unwrap_or_default());
                }
                Some(PG_LOCK_NOT_AVAILABLE) | Some(PG_QUERY_CANCELED) => {
                    return StoreError::LockTimeout;
                }
                Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED) => {
                    return StoreError::Aborted(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Unavailable(e.to_string())
    }
}

/// Ledger error types
///
/// Error codes are stable strings for API responses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error(
        "invalid fund: name must be non-empty (max {MAX_NAME_LENGTH} chars) and totalUnits must be between 1 and {MAX_UNITS}"
    )]
    InvalidFund,

    #[error("invalid owner: name must be non-empty (max {MAX_NAME_LENGTH} chars)")]
    InvalidOwner,

    #[error("invalid units: must be between {min} and {MAX_UNITS}")]
    InvalidUnits { min: i64 },

    #[error("cannot transfer to self")]
    SelfTransfer,

    // === Not Found ===
    #[error("fund {0} not found")]
    FundNotFound(Uuid),

    #[error("owner {owner:?} not found in fund {fund_id}")]
    OwnerNotFound { fund_id: Uuid, owner: String },

    // === Business Conflicts ===
    #[error("insufficient units for transfer: available {available}, requested {requested}")]
    InsufficientUnits { available: i32, requested: i32 },

    #[error("fund name already exists: {0}")]
    DuplicateFundName(String),

    #[error("idempotency key already used with different transfer data")]
    DuplicateIdempotencyKey,

    // === Store Errors ===
    #[error("{0}")]
    StoreUnavailable(StoreError),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidFund => "INVALID_FUND",
            LedgerError::InvalidOwner => "INVALID_OWNER",
            LedgerError::InvalidUnits { .. } => "INVALID_UNITS",
            LedgerError::SelfTransfer => "SELF_TRANSFER",
            LedgerError::FundNotFound(_) => "FUND_NOT_FOUND",
            LedgerError::OwnerNotFound { .. } => "OWNER_NOT_FOUND",
            LedgerError::InsufficientUnits { .. } => "INSUFFICIENT_UNITS",
            LedgerError::DuplicateFundName(_) => "DUPLICATE_FUND_NAME",
            LedgerError::DuplicateIdempotencyKey => "DUPLICATE_TRANSFER",
            LedgerError::StoreUnavailable(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidFund
            | LedgerError::InvalidOwner
            | LedgerError::InvalidUnits { .. }
            | LedgerError::SelfTransfer
            | LedgerError::InsufficientUnits { .. } => 400,
            LedgerError::FundNotFound(_) | LedgerError::OwnerNotFound { .. } => 404,
            LedgerError::DuplicateFundName(_) | LedgerError::DuplicateIdempotencyKey => 409,
            LedgerError::StoreUnavailable(_) => 500,
        }
    }

    /// Only transient store failures are worth retrying; the ledger never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(e) if e.is_transient())
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        LedgerError::StoreUnavailable(e)
    }
}
