//! # CommitmentLedger
//!
//! Append-only store of [`LedgerEntry`] records plus the nullifier set,
//! behind one `parking_lot::Mutex`. The lock is never held across an
//! `.await`; appends are synchronous and short.

use std::sync::Arc;

use concord_core::{Clock, ContentDigest, SystemClock};
use concord_crypto::{verify_inclusion_proof, Commitment, InclusionProof, MerkleMountainRange, Nullifier};
use parking_lot::Mutex;

use crate::chain::{verify_chain, ChainReport};
use crate::entry::{compute_entry_hash, compute_leaf_digest, genesis_parent, EntryType, LedgerEntry};
use crate::error::{AppendError, LedgerError};
use crate::export::LedgerExport;
use crate::nullifier::{NullifierRecord, NullifierRegistry};

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    mmr: MerkleMountainRange,
    nullifiers: NullifierRegistry,
}

pub struct CommitmentLedger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CommitmentLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitmentLedger").field("len", &self.len()).finish()
    }
}

impl Default for CommitmentLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitmentLedger {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { state: Mutex::new(LedgerState::default()), clock }
    }

    /// Atomically consume `nullifier` and append a linked entry.
    ///
    /// Everything that can fail is computed before the first mutation, so
    /// an `Err` leaves the ledger exactly as it was.
    pub fn append(
        &self,
        entry_type: EntryType,
        payload_commitment: Commitment,
        nullifier: Nullifier,
    ) -> Result<LedgerEntry, AppendError> {
        let mut state = self.state.lock();

        if let Some(existing) = state.nullifiers.get(&nullifier) {
            let first_index = existing.entry_index;
            drop(state);
            metrics::counter!("concord_nullifier_rejections_total").increment(1);
            tracing::warn!(%nullifier, first_index, entry_type = entry_type.as_str(), "nullifier reuse rejected");
            return Err(AppendError::NullifierReused { nullifier, first_index });
        }

        let index = state.entries.len() as u64;
        let parent_hash = state.entries.last().map_or_else(genesis_parent, |e| e.entry_hash);
        let committed_at = self.clock.now();
        let leaf = compute_leaf_digest(index, entry_type, &payload_commitment, &nullifier, &parent_hash, &committed_at)?;
        let merkle_root = state.mmr.root_with(&leaf);
        let entry_hash = compute_entry_hash(&leaf, &merkle_root)?;

        let entry = LedgerEntry {
            index,
            entry_type,
            payload_commitment,
            nullifier,
            parent_hash,
            merkle_root,
            committed_at,
            entry_hash,
        };
        let record = NullifierRecord { nullifier, first_consumed_at: committed_at, entry_index: index };
        if let Err(existing) = state.nullifiers.reserve(record) {
            // Unreachable while the lock is held; kept as a hard stop.
            return Err(AppendError::NullifierReused { nullifier, first_index: existing.entry_index });
        }
        state.mmr.append(&leaf);
        state.entries.push(entry.clone());
        drop(state);

        metrics::counter!("concord_ledger_appends_total", "entry_type" => entry_type.as_str()).increment(1);
        tracing::debug!(index, entry_type = entry_type.as_str(), entry_hash = %entry.entry_hash, "ledger entry appended");
        Ok(entry)
    }

    pub fn len(&self) -> u64 {
        self.state.lock().entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, index: u64) -> Option<LedgerEntry> {
        let idx = usize::try_from(index).ok()?;
        self.state.lock().entries.get(idx).cloned()
    }

    pub fn last_entry(&self) -> Option<LedgerEntry> {
        self.state.lock().entries.last().cloned()
    }

    pub fn contains_nullifier(&self, nullifier: &Nullifier) -> bool {
        self.state.lock().nullifiers.contains(nullifier)
    }

    pub fn nullifier_record(&self, nullifier: &Nullifier) -> Option<NullifierRecord> {
        self.state.lock().nullifiers.get(nullifier).cloned()
    }

    /// Indices of every stored entry that carries `nullifier`.
    ///
    /// Always zero or one entry for a sound ledger; the count is checked
    /// independently of the registry during receipt verification.
    pub fn nullifier_occurrences(&self, nullifier: &Nullifier) -> Vec<u64> {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.nullifier == *nullifier)
            .map(|e| e.index)
            .collect()
    }

    /// Current merkle root, `None` while empty.
    pub fn merkle_root(&self) -> Option<ContentDigest> {
        self.state.lock().mmr.root()
    }

    /// Recompute the chain from genesis through `index`.
    ///
    /// Works on a snapshot, so appends are not blocked while hashing.
    pub fn verify(&self, index: u64) -> Result<ChainReport, LedgerError> {
        let snapshot = self.state.lock().entries.clone();
        let report = verify_chain(&snapshot, index)?;
        if let Some(first_invalid) = report.first_invalid {
            tracing::error!(
                target_index = index,
                first_invalid,
                faults = report.faults.len(),
                "ledger chain verification failed; operator intervention required"
            );
        }
        Ok(report)
    }

    /// Prove entry `index` is under the current merkle root.
    pub fn inclusion_proof(&self, index: u64) -> Result<InclusionProof, LedgerError> {
        let state = self.state.lock();
        let len = state.entries.len() as u64;
        let idx = usize::try_from(index)
            .ok()
            .filter(|i| *i < state.entries.len())
            .ok_or(LedgerError::IndexOutOfRange { index, len })?;
        Ok(state.mmr.inclusion_proof(idx)?)
    }

    /// Check a proof against the current root and the stored entry.
    pub fn verify_inclusion(&self, proof: &InclusionProof) -> bool {
        let state = self.state.lock();
        let Some(entry) = state.entries.get(proof.leaf_index) else {
            return false;
        };
        let leaf_matches = matches!(entry.leaf_digest(), Ok(leaf) if leaf == proof.leaf);
        leaf_matches && state.mmr.root() == Some(proof.root) && verify_inclusion_proof(proof)
    }

    /// Point-in-time export taken under the ledger lock.
    pub fn export(&self) -> LedgerExport {
        let entries = self.state.lock().entries.clone();
        LedgerExport::from_entries(entries, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{ManualClock, Timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ledger() -> CommitmentLedger {
        let clock = ManualClock::new(Timestamp::parse("2026-05-01T08:00:00Z").unwrap());
        CommitmentLedger::with_clock(Arc::new(clock))
    }

    fn n(tag: u64) -> Nullifier {
        Nullifier::derive("ledger-test", &tag).unwrap()
    }

    fn fill(ledger: &CommitmentLedger, count: u64) {
        for i in 0..count {
            ledger.append(EntryType::Receipt, Commitment::of(&i).unwrap(), n(i)).unwrap();
        }
    }

    #[test]
    fn entries_are_linked_from_genesis() {
        let l = ledger();
        fill(&l, 3);
        let e0 = l.entry(0).unwrap();
        let e1 = l.entry(1).unwrap();
        assert_eq!(e0.parent_hash, genesis_parent());
        assert_eq!(e1.parent_hash, e0.entry_hash);
        assert_eq!(l.last_entry().unwrap().index, 2);
        assert_eq!(l.merkle_root(), Some(l.entry(2).unwrap().merkle_root));
    }

    #[test]
    fn reused_nullifier_rejected_without_mutation() {
        let l = ledger();
        fill(&l, 2);
        let before = l.export().entries;
        let err = l.append(EntryType::VoteCommitment, Commitment::of(&"again").unwrap(), n(1)).unwrap_err();
        match err {
            AppendError::NullifierReused { first_index, .. } => assert_eq!(first_index, 1),
            other => panic!("expected NullifierReused, got {other}"),
        }
        assert_eq!(l.export().entries, before);
        assert_eq!(l.nullifier_occurrences(&n(1)), vec![1]);
    }

    #[test]
    fn nullifier_record_points_at_entry() {
        let l = ledger();
        fill(&l, 2);
        let rec = l.nullifier_record(&n(1)).unwrap();
        assert_eq!(rec.entry_index, 1);
        assert_eq!(rec.first_consumed_at, l.entry(1).unwrap().committed_at);
        assert!(l.contains_nullifier(&n(0)));
        assert!(!l.contains_nullifier(&n(9)));
    }

    #[test]
    fn intact_ledger_verifies() {
        let l = ledger();
        fill(&l, 5);
        let report = l.verify(4).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.verified_through, Some(4));
        assert!(l.verify(5).is_err());
    }

    #[test]
    fn in_place_corruption_of_entry_two() {
        let l = ledger();
        fill(&l, 5);
        l.state.lock().entries[2].payload_commitment = Commitment::of(&"tampered").unwrap();

        let report = l.verify(4).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.first_invalid, Some(2));
        assert!(report.is_entry_valid(0));
        assert!(report.is_entry_valid(1));
        assert!(!report.is_entry_valid(2));
        assert!(!report.is_entry_valid(4));
        assert!(l.verify(1).unwrap().is_valid());
        // Never repaired.
        assert_eq!(l.entry(2).unwrap().payload_commitment, Commitment::of(&"tampered").unwrap());
    }

    #[test]
    fn inclusion_proofs_track_current_root() {
        let l = ledger();
        fill(&l, 4);
        let proof = l.inclusion_proof(2).unwrap();
        assert!(l.verify_inclusion(&proof));
        fill_more(&l);
        assert!(!l.verify_inclusion(&proof), "stale root must not verify");
        assert!(l.verify_inclusion(&l.inclusion_proof(2).unwrap()));
        assert!(matches!(l.inclusion_proof(99), Err(LedgerError::IndexOutOfRange { .. })));
    }

    fn fill_more(l: &CommitmentLedger) {
        l.append(EntryType::Receipt, Commitment::of(&"extra").unwrap(), n(1000)).unwrap();
    }

    #[test]
    fn concurrent_appends_on_one_nullifier_yield_one_winner() {
        let l = ledger();
        let wins = AtomicUsize::new(0);
        let reuses = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for t in 0..16u64 {
                let (l, wins, reuses) = (&l, &wins, &reuses);
                s.spawn(move || {
                    match l.append(EntryType::VoteCommitment, Commitment::of(&t).unwrap(), n(42)) {
                        Ok(_) => wins.fetch_add(1, Ordering::SeqCst),
                        Err(AppendError::NullifierReused { .. }) => reuses.fetch_add(1, Ordering::SeqCst),
                        Err(e) => panic!("unexpected error: {e}"),
                    };
                });
            }
        });
        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert_eq!(reuses.load(Ordering::SeqCst), 15);
        assert_eq!(l.len(), 1);
        assert!(l.verify(0).unwrap().is_valid());
    }

    #[test]
    fn concurrent_distinct_appends_keep_chain_valid() {
        let l = ledger();
        std::thread::scope(|s| {
            for t in 0..8u64 {
                let l = &l;
                s.spawn(move || {
                    for k in 0..10u64 {
                        l.append(EntryType::Receipt, Commitment::of(&k).unwrap(), n(t * 100 + k)).unwrap();
                    }
                });
            }
        });
        assert_eq!(l.len(), 80);
        assert!(l.verify(79).unwrap().is_valid());
    }

    #[test]
    fn export_is_ordered_with_deduplicated_roots() {
        let l = ledger();
        fill(&l, 3);
        let export = l.export();
        assert_eq!(export.entries.len(), 3);
        assert_eq!(export.merkle_roots.len(), 3);
        assert_eq!(export.merkle_roots[2], export.entries[2].merkle_root);
        assert_eq!(export.exported_at, Timestamp::parse("2026-05-01T08:00:00Z").unwrap());
    }
}
