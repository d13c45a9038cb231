//! # Chain Verification
//!
//! Recomputes every link from genesis. Expected values always come from
//! recomputation, never from the stored neighbour, so a corrupted entry
//! also breaks the parent link and merkle root of every entry after it.

use concord_core::ContentDigest;
use concord_crypto::MerkleMountainRange;
use serde::{Deserialize, Serialize};

use crate::entry::{compute_entry_hash, genesis_parent, LedgerEntry};
use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultKind {
    IndexMismatch { expected: u64, found: u64 },
    ParentMismatch { expected: ContentDigest, found: ContentDigest },
    MerkleRootMismatch { expected: ContentDigest, found: ContentDigest },
    EntryHashMismatch { expected: ContentDigest, found: ContentDigest },
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndexMismatch { .. } => "index_mismatch",
            Self::ParentMismatch { .. } => "parent_mismatch",
            Self::MerkleRootMismatch { .. } => "merkle_root_mismatch",
            Self::EntryHashMismatch { .. } => "entry_hash_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFault {
    pub index: u64,
    #[serde(flatten)]
    pub kind: FaultKind,
}

/// Outcome of recomputing the chain from genesis through `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub target: u64,
    /// Highest index whose whole prefix verified, if any.
    pub verified_through: Option<u64>,
    pub first_invalid: Option<u64>,
    pub faults: Vec<ChainFault>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.first_invalid.is_none()
    }

    /// An entry is valid only if it and every entry before it verified.
    pub fn is_entry_valid(&self, index: u64) -> bool {
        index <= self.target && self.first_invalid.map_or(true, |bad| index < bad)
    }
}

/// Verify `entries[0..=through]`.
///
/// Faults are collected rather than stopping at the first, so an auditor
/// sees every broken link. Detected faults are logged at `error` level.
pub fn verify_chain(entries: &[LedgerEntry], through: u64) -> Result<ChainReport, LedgerError> {
    let len = entries.len() as u64;
    if through >= len {
        return Err(LedgerError::IndexOutOfRange { index: through, len });
    }

    let mut mmr = MerkleMountainRange::new();
    let mut expected_parent = genesis_parent();
    let mut faults = Vec::new();

    for (i, entry) in (0u64..).zip(&entries[..=through as usize]) {
        if entry.index != i {
            faults.push(ChainFault { index: i, kind: FaultKind::IndexMismatch { expected: i, found: entry.index } });
        }
        if entry.parent_hash != expected_parent {
            faults.push(ChainFault {
                index: i,
                kind: FaultKind::ParentMismatch { expected: expected_parent, found: entry.parent_hash },
            });
        }

        let leaf = entry.leaf_digest()?;
        mmr.append(&leaf);
        let root = mmr.root().unwrap_or(leaf);
        if entry.merkle_root != root {
            faults.push(ChainFault {
                index: i,
                kind: FaultKind::MerkleRootMismatch { expected: root, found: entry.merkle_root },
            });
        }

        let hash = compute_entry_hash(&leaf, &root)?;
        if entry.entry_hash != hash {
            faults.push(ChainFault {
                index: i,
                kind: FaultKind::EntryHashMismatch { expected: hash, found: entry.entry_hash },
            });
        }
        expected_parent = hash;
    }

    let first_invalid = faults.first().map(|f| f.index);
    for fault in &faults {
        tracing::error!(
            index = fault.index,
            fault = fault.kind.as_str(),
            "ledger integrity fault"
        );
    }

    Ok(ChainReport {
        target: through,
        verified_through: match first_invalid {
            None => Some(through),
            Some(0) => None,
            Some(bad) => Some(bad - 1),
        },
        first_invalid,
        faults,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::{CommitmentLedger, EntryType};
    use concord_crypto::{Commitment, Nullifier};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn single_corruption_invalidates_exactly_the_suffix(len in 1u64..12, pick in any::<prop::sample::Index>()) {
            let ledger = CommitmentLedger::new();
            for i in 0..len {
                ledger
                    .append(EntryType::VoteCommitment, Commitment::of(&i).unwrap(), Nullifier::derive("prop", &i).unwrap())
                    .unwrap();
            }
            let mut entries = ledger.export().entries;
            let k = pick.index(len as usize);
            entries[k].payload_commitment = Commitment::of(&"corrupt").unwrap();

            let report = verify_chain(&entries, len - 1).unwrap();
            prop_assert_eq!(report.first_invalid, Some(k as u64));
            for i in 0..len {
                prop_assert_eq!(report.is_entry_valid(i), i < k as u64);
            }
        }
    }
}
