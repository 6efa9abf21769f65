//! Stateless transfer validation (no I/O)

use crate::error::LedgerError;
use crate::validation::{checked_units, normalize_name};

use super::types::{TransferRequest, ValidatedTransfer};

impl TransferRequest {
    /// Trim owner names and check units and self-transfer.
    ///
    /// Owner names are compared case-sensitively after trimming.
    pub fn validate(&self) -> Result<ValidatedTransfer, LedgerError> {
        let from_owner = normalize_name(&self.from_owner).ok_or(LedgerError::InvalidOwner)?;
        let to_owner = normalize_name(&self.to_owner).ok_or(LedgerError::InvalidOwner)?;
        let units = checked_units(self.units, 1).ok_or(LedgerError::InvalidUnits { min: 1 })?;

        if from_owner == to_owner {
            return Err(LedgerError::SelfTransfer);
        }

        Ok(ValidatedTransfer {
            fund_id: self.fund_id,
            from_owner,
            to_owner,
            units,
            idempotency_key: self.idempotency_key,
        })
    }
}
