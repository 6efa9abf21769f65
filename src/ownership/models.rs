//! Cap table entry and read model

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::validation::{Page, checked_units, normalize_name};

/// Soft-delete state of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl EntryState {
    /// Map the nullable `deleted_at` column.
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => EntryState::Deleted { at },
            None => EntryState::Active,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            EntryState::Active => None,
            EntryState::Deleted { at } => Some(*at),
        }
    }
}

/// One owner's stake in one fund
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapTableEntry {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub owner_name: String,
    /// Never negative; zero marks a sold-out historical owner
    pub units: i32,
    /// Set once at creation
    pub acquired_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: EntryState,
}

impl CapTableEntry {
    /// Validate and construct a new active entry.
    pub fn new(fund_id: Uuid, owner_name: &str, units: i64) -> Result<Self, LedgerError> {
        let owner_name = normalize_name(owner_name).ok_or(LedgerError::InvalidOwner)?;
        let units = checked_units(units, 0).ok_or(LedgerError::InvalidUnits { min: 0 })?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            fund_id,
            owner_name,
            units,
            acquired_at: now,
            updated_at: now,
            state: EntryState::Active,
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, EntryState::Active)
    }

    /// Share of `total_units` held by this entry, in percent.
    pub fn percentage_of(&self, total_units: i32) -> f64 {
        if total_units <= 0 {
            return 0.0;
        }
        f64::from(self.units) * 100.0 / f64::from(total_units)
    }
}

/// Paged cap table of one fund
#[derive(Debug, Clone, PartialEq)]
pub struct CapTableView {
    pub fund_id: Uuid,
    pub fund_name: String,
    pub total_units: i32,
    /// Active entries, largest holders first
    pub entries: Page<CapTableEntry>,
}

impl CapTableView {
    /// Entries paired with their percentage of the fund.
    pub fn rows(&self) -> impl Iterator<Item = (&CapTableEntry, f64)> {
        self.entries
            .items
            .iter()
            .map(|e| (e, e.percentage_of(self.total_units)))
    }
}
