//! # Replay Protection Under Concurrency
//!
//! N concurrent submissions of the same vote or the same action must
//! produce exactly one success; the rest are rejected as replays and the
//! ledger holds a single entry for them.

use std::sync::Arc;

use concord_core::{ActionId, JurisdictionId, ManualClock, Timestamp};
use concord_crypto::{Commitment, Nullifier};
use concord_federation::{
    ActionKind, ConsensusError, Federation, FederationConfig, ReceiptError, SubjectAction,
};
use concord_ledger::{AppendError, CommitmentLedger, EntryType};
use concord_proof::{DigestBindingGate, Statement};
use concord_state::Threshold;

const N: usize = 24;

fn federation() -> Arc<Federation<DigestBindingGate>> {
    let config = FederationConfig::from_str_validated(
        "jurisdictions:\n  - {code: KE, name: Kenya, governance: unitary}\n  - {code: NG, name: Nigeria, governance: federal}\n  - {code: ZA, name: South Africa, governance: unitary}\n",
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new(Timestamp::parse("2026-10-01T12:00:00Z").unwrap()));
    Arc::new(Federation::build(config, clock, |_| DigestBindingGate::new()).unwrap())
}

fn id(s: &str) -> JurisdictionId {
    JurisdictionId::new(s).unwrap()
}

#[test]
fn raw_ledger_race_on_one_nullifier() {
    let ledger = CommitmentLedger::new();
    let nullifier = Nullifier::derive("race", &"shared").unwrap();
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..N)
            .map(|i| {
                let ledger = &ledger;
                s.spawn(move || ledger.append(EntryType::Receipt, Commitment::of(&i).unwrap(), nullifier))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results.iter().filter(|r| matches!(r, Err(AppendError::NullifierReused { first_index: 0, .. }))).count(),
        N - 1
    );
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.nullifier_occurrences(&nullifier), [0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn same_vote_submitted_concurrently() {
    let f = federation();
    let p = f
        .consensus()
        .open_proposal(vec![id("KE"), id("NG"), id("ZA")], Threshold::from_percent(100).unwrap(), "race")
        .unwrap()
        .id;
    let proof = DigestBindingGate::attest(&Statement::Vote { proposal_id: p, jurisdiction: id("KE"), support: true })
        .unwrap();

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let f = Arc::clone(&f);
            let proof = proof.clone();
            tokio::spawn(async move { f.consensus().cast_vote(p, &id("KE"), true, proof).await })
        })
        .collect();

    let mut accepted = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(ConsensusError::DuplicateVote { .. }) => {}
            Err(e) => panic!("unexpected rejection: {e}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(f.ledger().len(), 1);
    assert_eq!(f.consensus().proposal(&p).unwrap().votes.len(), 1);
    assert_eq!(f.consensus().rejected_attempts().len(), N - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn same_action_submitted_concurrently() {
    let f = federation();
    let action = SubjectAction {
        id: ActionId::new("wd-42").unwrap(),
        kind: ActionKind::Withdrawal,
        amount: 500,
        currency: "ZAR".into(),
        recipient: "R1".into(),
        purpose: "payroll".into(),
        timestamp: Timestamp::parse("2026-10-01T11:59:00Z").unwrap(),
        attestor: id("ZA"),
    };

    let handles: Vec<_> = (0..N)
        .map(|_| {
            let f = Arc::clone(&f);
            let action = action.clone();
            tokio::spawn(async move { f.receipts().issue_receipt(action, DigestBindingGate::attest).await })
        })
        .collect();

    let mut issued = Vec::new();
    for h in handles {
        match h.await.unwrap() {
            Ok(receipt) => issued.push(receipt),
            Err(ReceiptError::NullifierReused { .. }) => {}
            Err(e) => panic!("unexpected rejection: {e}"),
        }
    }
    assert_eq!(issued.len(), 1);
    assert_eq!(f.ledger().len(), 1);
    assert_eq!(f.receipts().receipts().len(), 1);
    assert!(f.receipts().verify_receipt(&issued[0].id).unwrap().valid);
}
