//! # Ledger Export
//!
//! The audit surface: every entry in order, every distinct merkle root
//! in first-seen order, and the export time. An export can be checked
//! offline with [`LedgerExport::verify`] without access to the live
//! ledger.

use std::collections::HashSet;

use concord_core::{ContentDigest, Timestamp};
use serde::{Deserialize, Serialize};

use crate::chain::{verify_chain, ChainReport};
use crate::entry::LedgerEntry;
use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerExport {
    pub entries: Vec<LedgerEntry>,
    pub merkle_roots: Vec<ContentDigest>,
    pub exported_at: Timestamp,
}

impl LedgerExport {
    pub fn from_entries(entries: Vec<LedgerEntry>, exported_at: Timestamp) -> Self {
        let mut seen = HashSet::new();
        let merkle_roots = entries
            .iter()
            .map(|e| e.merkle_root)
            .filter(|root| seen.insert(*root))
            .collect();
        Self { entries, merkle_roots, exported_at }
    }

    /// Recompute the chain through `through`, or through the last entry.
    ///
    /// An empty export has nothing to verify and yields `Ok(None)`.
    pub fn verify(&self, through: Option<u64>) -> Result<Option<ChainReport>, LedgerError> {
        let Some(last) = (self.entries.len() as u64).checked_sub(1) else {
            return match through {
                None => Ok(None),
                Some(index) => Err(LedgerError::IndexOutOfRange { index, len: 0 }),
            };
        };
        verify_chain(&self.entries, through.unwrap_or(last)).map(Some)
    }

    /// Whether `merkle_roots` is exactly the deduplicated root sequence of
    /// `entries`.
    pub fn roots_consistent(&self) -> bool {
        Self::from_entries(self.entries.clone(), self.exported_at).merkle_roots == self.merkle_roots
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryType;
    use crate::CommitmentLedger;
    use concord_crypto::{Commitment, Nullifier};

    fn populated(n: u64) -> LedgerExport {
        let l = CommitmentLedger::new();
        for i in 0..n {
            l.append(EntryType::Receipt, Commitment::of(&i).unwrap(), Nullifier::derive("x", &i).unwrap())
                .unwrap();
        }
        l.export()
    }

    #[test]
    fn json_roundtrip_still_verifies() {
        let export = populated(4);
        let back = LedgerExport::from_json(&export.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, export);
        assert!(back.verify(None).unwrap().unwrap().is_valid());
        assert!(back.roots_consistent());
    }

    #[test]
    fn tampered_export_fails_offline() {
        let mut export = populated(5);
        export.entries[2].nullifier = Nullifier::derive("x", &99u64).unwrap();
        let report = export.verify(Some(4)).unwrap().unwrap();
        assert_eq!(report.first_invalid, Some(2));
        assert!(report.is_entry_valid(1));
    }

    #[test]
    fn empty_export() {
        let export = populated(0);
        assert!(export.verify(None).unwrap().is_none());
        assert!(export.verify(Some(0)).is_err());
        assert!(export.merkle_roots.is_empty());
    }

    #[test]
    fn dropped_root_is_inconsistent() {
        let mut export = populated(3);
        export.merkle_roots.pop();
        assert!(!export.roots_consistent());
    }
}
