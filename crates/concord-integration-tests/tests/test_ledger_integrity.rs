//! # Ledger Integrity
//!
//! Chain verification and inclusion proofs over a ledger shared by votes
//! and receipts, checked both live and from an export.

use std::sync::Arc;

use concord_core::{ManualClock, Timestamp};
use concord_crypto::{verify_inclusion_proof, Commitment, Nullifier};
use concord_ledger::{verify_chain, CommitmentLedger, EntryType, FaultKind, LedgerExport};

fn ledger_of(n: u64) -> CommitmentLedger {
    let clock = Arc::new(ManualClock::new(Timestamp::parse("2026-09-01T00:00:00Z").unwrap()));
    let ledger = CommitmentLedger::with_clock(clock.clone());
    for i in 0..n {
        let entry_type = if i % 2 == 0 { EntryType::VoteCommitment } else { EntryType::Receipt };
        ledger
            .append(entry_type, Commitment::of(&("payload", i)).unwrap(), Nullifier::derive("integrity", &i).unwrap())
            .unwrap();
        clock.advance(60);
    }
    ledger
}

#[test]
fn scenario_d_in_place_corruption_of_entry_two() {
    let mut export = ledger_of(5).export();
    export.entries[2].payload_commitment = Commitment::of(&"forged").unwrap();

    let report = verify_chain(&export.entries, 4).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.first_invalid, Some(2));
    assert!(report.is_entry_valid(0));
    assert!(report.is_entry_valid(1));
    for i in 2..=4 {
        assert!(!report.is_entry_valid(i));
    }
    assert!(report.faults.iter().all(|f| f.index >= 2));
    assert!(report
        .faults
        .iter()
        .any(|f| f.index == 3 && matches!(f.kind, FaultKind::ParentMismatch { .. })));
}

#[test]
fn valid_ledger_verifies_at_last_index() {
    let ledger = ledger_of(9);
    let report = ledger.verify(8).unwrap();
    assert!(report.is_valid());
    assert_eq!(report.verified_through, Some(8));
    assert!(ledger.verify(9).is_err());
}

#[test]
fn entries_link_to_their_parent() {
    let export = ledger_of(4).export();
    for pair in export.entries.windows(2) {
        assert_eq!(pair[1].parent_hash, pair[0].entry_hash);
        assert_eq!(pair[1].index, pair[0].index + 1);
    }
    assert_eq!(export.entries[0].parent_hash.to_hex(), "0".repeat(64));
}

#[test]
fn every_entry_has_a_valid_inclusion_proof() {
    let ledger = ledger_of(11);
    for i in 0..11 {
        let proof = ledger.inclusion_proof(i).unwrap();
        assert!(verify_inclusion_proof(&proof), "entry {i}");
        assert!(ledger.verify_inclusion(&proof), "entry {i}");
    }
}

#[test]
fn stale_inclusion_proof_fails_against_grown_ledger() {
    let ledger = ledger_of(3);
    let proof = ledger.inclusion_proof(1).unwrap();
    ledger
        .append(EntryType::Receipt, Commitment::of(&"later").unwrap(), Nullifier::derive("integrity", &99u64).unwrap())
        .unwrap();
    // Still a sound proof for the old root, but not for the current one.
    assert!(verify_inclusion_proof(&proof));
    assert!(!ledger.verify_inclusion(&proof));
}

#[test]
fn export_survives_json_and_records_each_root_once() {
    let ledger = ledger_of(6);
    let export = ledger.export();
    assert_eq!(export.merkle_roots.len(), 6);
    assert_eq!(export.merkle_roots.last().copied(), ledger.merkle_root());

    let back = LedgerExport::from_json(&export.to_json_pretty().unwrap()).unwrap();
    assert_eq!(back, export);
    assert!(back.verify(None).unwrap().unwrap().is_valid());
}

#[test]
fn reused_nullifier_leaves_ledger_untouched() {
    let ledger = ledger_of(3);
    let before = ledger.export().entries;
    let err = ledger
        .append(EntryType::Receipt, Commitment::of(&"again").unwrap(), Nullifier::derive("integrity", &1u64).unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("already consumed by ledger entry 1"));
    assert_eq!(ledger.export().entries, before);
}
