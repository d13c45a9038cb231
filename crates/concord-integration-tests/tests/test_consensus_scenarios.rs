//! # Consensus Scenarios
//!
//! Proposal lifecycle through the full stack: registry from config,
//! digest-binding proofs, ledger-backed vote commitments.

use std::sync::Arc;

use concord_core::{JurisdictionId, ProposalId, SystemClock};
use concord_federation::{ConsensusError, Federation, FederationConfig};
use concord_ledger::EntryType;
use concord_proof::{DigestBindingGate, ProofArtifact, Statement};
use concord_state::{ProposalStatus, Threshold};
use proptest::prelude::*;

const CONFIG: &str = r#"
jurisdictions:
  - {code: KE, name: Kenya, governance: unitary}
  - {code: NG, name: Nigeria, governance: federal}
  - {code: ZA, name: South Africa, governance: unitary}
  - {code: CH, name: Switzerland, governance: confederate, privacy: strict}
  - {code: BR, name: Brazil, governance: federal, privacy: open}
"#;

fn federation() -> Federation<DigestBindingGate> {
    let config = FederationConfig::from_str_validated(CONFIG).unwrap();
    Federation::build(config, Arc::new(SystemClock), |_| DigestBindingGate::new()).unwrap()
}

fn id(s: &str) -> JurisdictionId {
    JurisdictionId::new(s).unwrap()
}

fn proof(p: ProposalId, j: &str, support: bool) -> ProofArtifact {
    DigestBindingGate::attest(&Statement::Vote { proposal_id: p, jurisdiction: id(j), support }).unwrap()
}

async fn vote(
    f: &Federation<DigestBindingGate>,
    p: ProposalId,
    j: &str,
    support: bool,
) -> Result<ProposalStatus, ConsensusError> {
    f.consensus().cast_vote(p, &id(j), support, proof(p, j, support)).await.map(|o| o.status)
}

fn open_three(f: &Federation<DigestBindingGate>) -> ProposalId {
    f.consensus()
        .open_proposal(vec![id("KE"), id("NG"), id("ZA")], Threshold::from_fraction(0.67).unwrap(), "regional corridor")
        .unwrap()
        .id
}

#[tokio::test]
async fn scenario_a_two_supports_pass_and_third_is_closed() {
    let f = federation();
    let p = open_three(&f);

    assert_eq!(vote(&f, p, "KE", true).await.unwrap(), ProposalStatus::Voting);
    assert_eq!(vote(&f, p, "NG", true).await.unwrap(), ProposalStatus::Passed);
    let late = vote(&f, p, "ZA", true).await.unwrap_err();
    assert!(matches!(late, ConsensusError::ProposalClosed { .. }));

    let proposal = f.consensus().proposal(&p).unwrap();
    assert_eq!(proposal.votes.len(), 2);
    assert_eq!(proposal.tally.support_percent(), 67);
    let entries = f.export().entries;
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.entry_type == EntryType::VoteCommitment));
}

#[tokio::test]
async fn scenario_b_support_then_two_oppose_fails() {
    let f = federation();
    let p = open_three(&f);
    assert_eq!(vote(&f, p, "KE", true).await.unwrap(), ProposalStatus::Voting);
    assert_eq!(vote(&f, p, "NG", false).await.unwrap(), ProposalStatus::Voting);
    assert_eq!(vote(&f, p, "ZA", false).await.unwrap(), ProposalStatus::Failed);
    assert_eq!(vote(&f, p, "ZA", true).await.unwrap_err().code(), "proposal_closed");
}

#[tokio::test]
async fn votes_are_recorded_in_arrival_order() {
    let f = federation();
    let p = f
        .consensus()
        .open_proposal(
            vec![id("KE"), id("NG"), id("ZA"), id("CH"), id("BR")],
            Threshold::from_percent(100).unwrap(),
            "unanimous",
        )
        .unwrap()
        .id;
    for j in ["CH", "KE", "BR"] {
        vote(&f, p, j, true).await.unwrap();
    }
    let proposal = f.consensus().proposal(&p).unwrap();
    let order: Vec<_> = proposal.votes.iter().map(|v| v.jurisdiction.as_str()).collect();
    assert_eq!(order, ["CH", "KE", "BR"]);
    let indices: Vec<_> = proposal.votes.iter().map(|v| v.ledger_index).collect();
    assert_eq!(indices, [0, 1, 2]);
}

#[tokio::test]
async fn proposals_are_independent() {
    let f = federation();
    let a = open_three(&f);
    let b = open_three(&f);
    vote(&f, a, "KE", true).await.unwrap();
    vote(&f, a, "NG", true).await.unwrap();
    // A's verdict does not close B, and KE can still vote on B.
    assert_eq!(vote(&f, b, "KE", false).await.unwrap(), ProposalStatus::Voting);
    let listed: Vec<_> = f.consensus().proposals().iter().map(|p| p.id).collect();
    assert_eq!(listed, [a, b]);
}

#[tokio::test]
async fn deactivated_member_keeps_its_open_vote() {
    let f = federation();
    let p = open_three(&f);
    f.registry().deactivate(&id("ZA")).unwrap();
    vote(&f, p, "KE", true).await.unwrap();
    assert_eq!(vote(&f, p, "ZA", true).await.unwrap(), ProposalStatus::Passed);
    assert!(f.consensus().open_proposal(vec![id("KE"), id("ZA")], Threshold::from_percent(50).unwrap(), "").is_err());
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Once terminal, a proposal never changes status, and every later
    /// vote is rejected as closed.
    #[test]
    fn terminal_status_is_absorbing(pct in 1u8..=100, supports in prop::collection::vec(any::<bool>(), 5)) {
        let rt = runtime();
        rt.block_on(async {
            let f = federation();
            let members = ["KE", "NG", "ZA", "CH", "BR"];
            let p = f
                .consensus()
                .open_proposal(members.iter().map(|m| id(m)).collect(), Threshold::from_percent(pct).unwrap(), "prop")
                .unwrap()
                .id;

            let mut terminal: Option<ProposalStatus> = None;
            for (j, support) in members.iter().zip(supports) {
                let result = vote(&f, p, j, support).await;
                match terminal {
                    Some(_) => {
                        let closed = matches!(result, Err(ConsensusError::ProposalClosed { .. }));
                        prop_assert!(closed);
                    }
                    None => {
                        let status = result.unwrap();
                        if status != ProposalStatus::Voting {
                            terminal = Some(status);
                        }
                    }
                }
                let now = f.consensus().proposal(&p).unwrap().status();
                if let Some(t) = terminal {
                    prop_assert_eq!(now, t);
                }
            }
            // Every member got a say or the proposal closed early.
            prop_assert!(terminal.is_some());
            Ok(())
        })?;
    }
}
