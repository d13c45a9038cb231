//! # NullifierRegistry
//!
//! The spent-set view over the ledger. Reservation is crate-private: the
//! only way to consume a nullifier is [`CommitmentLedger::append`](crate::CommitmentLedger::append),
//! which checks and reserves inside the same critical section as the
//! entry push.

use std::collections::HashMap;

use concord_core::Timestamp;
use concord_crypto::Nullifier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierRecord {
    pub nullifier: Nullifier,
    pub first_consumed_at: Timestamp,
    pub entry_index: u64,
}

#[derive(Debug, Default)]
pub struct NullifierRegistry {
    records: HashMap<Nullifier, NullifierRecord>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.records.contains_key(nullifier)
    }

    pub fn get(&self, nullifier: &Nullifier) -> Option<&NullifierRecord> {
        self.records.get(nullifier)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record first consumption. On reuse, returns the existing record
    /// and leaves the registry unchanged.
    pub(crate) fn reserve(&mut self, record: NullifierRecord) -> Result<(), NullifierRecord> {
        use std::collections::hash_map::Entry;
        match self.records.entry(record.nullifier) {
            Entry::Occupied(existing) => Err(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: &str, index: u64) -> NullifierRecord {
        NullifierRecord {
            nullifier: Nullifier::derive("test", &tag).unwrap(),
            first_consumed_at: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
            entry_index: index,
        }
    }

    #[test]
    fn second_reservation_returns_first_record() {
        let mut reg = NullifierRegistry::new();
        reg.reserve(record("a", 0)).unwrap();
        let existing = reg.reserve(record("a", 7)).unwrap_err();
        assert_eq!(existing.entry_index, 0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn distinct_nullifiers_coexist() {
        let mut reg = NullifierRegistry::new();
        reg.reserve(record("a", 0)).unwrap();
        reg.reserve(record("b", 1)).unwrap();
        assert!(reg.contains(&record("b", 0).nullifier));
        assert_eq!(reg.get(&record("a", 0).nullifier).unwrap().entry_index, 0);
    }
}
