//! Transfer types

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Immutable record of a committed unit movement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub from_owner: String,
    pub to_owner: String,
    pub units: i32,
    pub idempotency_key: Option<Uuid>,
    /// Assigned by the store when the record is appended
    pub transferred_at: DateTime<Utc>,
}

/// Transfer request as received from a caller (untrimmed, unchecked)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub fund_id: Uuid,
    pub from_owner: String,
    pub to_owner: String,
    pub units: i64,
    pub idempotency_key: Option<Uuid>,
}

impl TransferRequest {
    pub fn new(
        fund_id: Uuid,
        from_owner: impl Into<String>,
        to_owner: impl Into<String>,
        units: i64,
    ) -> Self {
        Self {
            fund_id,
            from_owner: from_owner.into(),
            to_owner: to_owner.into(),
            units,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// A request that passed stateless validation: names trimmed, units in range,
/// owners distinct.
///
/// Built by [`TransferRequest::validate`]. The fields stay public so store
/// tests can construct one; the stores re-check the invariants they enforce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub fund_id: Uuid,
    pub from_owner: String,
    pub to_owner: String,
    pub units: i32,
    pub idempotency_key: Option<Uuid>,
}

/// Outcome of looking up a request's idempotency key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replay {
    /// No key supplied, or the key has never been used
    Fresh,
    /// The key belongs to an identical, already committed transfer
    Matches(Transfer),
    /// The key was used for a different transfer
    Conflicts(Transfer),
}

impl ValidatedTransfer {
    /// Same fund, owners and units as an existing record.
    pub fn matches(&self, existing: &Transfer) -> bool {
        self.fund_id == existing.fund_id
            && self.from_owner == existing.from_owner
            && self.to_owner == existing.to_owner
            && self.units == existing.units
    }

    pub fn classify_replay(&self, existing: Option<Transfer>) -> Replay {
        match existing {
            None => Replay::Fresh,
            Some(t) if self.matches(&t) => Replay::Matches(t),
            Some(t) => Replay::Conflicts(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(fund_id: Uuid, units: i32) -> ValidatedTransfer {
        ValidatedTransfer {
            fund_id,
            from_owner: "Alice".into(),
            to_owner: "Bob".into(),
            units,
            idempotency_key: Some(Uuid::nil()),
        }
    }

    fn record(fund_id: Uuid, from: &str, to: &str, units: i32) -> Transfer {
        Transfer {
            id: Uuid::new_v4(),
            fund_id,
            from_owner: from.into(),
            to_owner: to.into(),
            units,
            idempotency_key: Some(Uuid::nil()),
            transferred_at: Utc::now(),
        }
    }

    #[test]
    fn test_classify_replay() {
        let fund_id = Uuid::new_v4();
        let req = validated(fund_id, 200);

        assert_eq!(req.classify_replay(None), Replay::Fresh);

        let same = record(fund_id, "Alice", "Bob", 200);
        assert_eq!(req.classify_replay(Some(same.clone())), Replay::Matches(same));

        for other in [
            record(fund_id, "Alice", "Bob", 201),
            record(fund_id, "Alice", "Carol", 200),
            record(fund_id, "Bob", "Alice", 200),
            record(Uuid::new_v4(), "Alice", "Bob", 200),
        ] {
            assert!(matches!(req.classify_replay(Some(other)), Replay::Conflicts(_)));
        }
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let fund_id = Uuid::new_v4();
        let req = validated(fund_id, 5);
        assert!(!req.matches(&record(fund_id, "ALICE", "Bob", 5)));
    }
}
