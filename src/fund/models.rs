//! Fund entity

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::validation::{checked_units, normalize_name};

/// An investment vehicle with a fixed total unit count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fund {
    pub id: Uuid,
    pub name: String,
    /// Conserved quantity: active entries of this fund always sum to it
    pub total_units: i32,
    pub created_at: DateTime<Utc>,
}

impl Fund {
    /// Validate and construct a new fund with a fresh id.
    ///
    /// The name is trimmed; `total_units` must be in `1..=MAX_UNITS`.
    pub fn new(name: &str, total_units: i64) -> Result<Self, LedgerError> {
        let name = normalize_name(name).ok_or(LedgerError::InvalidFund)?;
        let total_units = checked_units(total_units, 1).ok_or(LedgerError::InvalidFund)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            total_units,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{MAX_NAME_LENGTH, MAX_UNITS};

    #[test]
    fn test_new_fund_trims_name() {
        let fund = Fund::new("  Growth Fund I ", 1000).unwrap();
        assert_eq!(fund.name, "Growth Fund I");
        assert_eq!(fund.total_units, 1000);
    }

    #[test]
    fn test_new_fund_assigns_unique_ids() {
        let a = Fund::new("A", 1).unwrap();
        let b = Fund::new("A", 1).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_fund_rejects_bad_name() {
        assert_eq!(Fund::new("", 10), Err(LedgerError::InvalidFund));
        assert_eq!(Fund::new(" \n ", 10), Err(LedgerError::InvalidFund));
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(Fund::new(&long, 10), Err(LedgerError::InvalidFund));
    }

    #[test]
    fn test_new_fund_unit_bounds() {
        assert_eq!(Fund::new("F", 0), Err(LedgerError::InvalidFund));
        assert_eq!(Fund::new("F", -5), Err(LedgerError::InvalidFund));
        assert_eq!(Fund::new("F", MAX_UNITS + 1), Err(LedgerError::InvalidFund));
        assert_eq!(Fund::new("F", MAX_UNITS).unwrap().total_units, i32::MAX);
    }
}
