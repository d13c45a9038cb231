//! # Consensus Engine
//!
//! Opens proposals across registered jurisdictions and admits
//! proof-gated votes until a verdict is reached.
//!
//! ## Vote admission
//!
//! 1. Cheap pre-checks under the proposal lock: closed, non-participant,
//!    already voted.
//! 2. The proof is verified with **no lock held**. This is the only
//!    suspension point; dropping the future here has no side effect.
//! 3. The proposal lock is retaken and the pre-checks repeated, since
//!    another vote may have finalized the proposal meanwhile.
//! 4. Still under the proposal lock, the vote commitment is appended to
//!    the ledger with `Nullifier::for_vote(proposal, jurisdiction)`. A
//!    reused nullifier is reported as a duplicate vote.
//! 5. The vote is recorded and the tally decides the status. Passing is
//!    checked before failing, and may end voting early.
//!
//! Because steps 3 to 5 run inside one per-proposal critical section, two
//! racing votes cannot both observe "below threshold" and then finalize
//! with conflicting verdicts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use concord_core::{Clock, JurisdictionId, ProposalId, SystemClock, Timestamp};
use concord_crypto::{Commitment, Nullifier};
use concord_ledger::{AppendError, CommitmentLedger, EntryType};
use concord_proof::{ProofArtifact, ProofGate, Statement, Verification, VerificationFailure};
use concord_state::{Lifecycle, ProposalStatus, ProposalTally, Threshold, Tracked};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::error::{ConsensusError, RegistryError};
use crate::journal::{Journal, RejectedAttempt};
use crate::registry::JurisdictionRegistry;

/// An accepted vote. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub jurisdiction: JurisdictionId,
    pub support: bool,
    pub proof: ProofArtifact,
    pub accepted_at: Timestamp,
    /// Index of the vote-commitment entry in the ledger.
    pub ledger_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub description: String,
    pub participants: Vec<JurisdictionId>,
    pub threshold: Threshold,
    /// In arrival order.
    pub votes: Vec<Vote>,
    pub tally: ProposalTally,
    pub status: Tracked<ProposalStatus>,
    pub opened_at: Timestamp,
}

impl Proposal {
    pub fn status(&self) -> ProposalStatus {
        self.status.status()
    }

    pub fn is_participant(&self, jurisdiction: &JurisdictionId) -> bool {
        self.participants.contains(jurisdiction)
    }

    pub fn has_voted(&self, jurisdiction: &JurisdictionId) -> bool {
        self.votes.iter().any(|v| &v.jurisdiction == jurisdiction)
    }

    pub fn vote_of(&self, jurisdiction: &JurisdictionId) -> Option<&Vote> {
        self.votes.iter().find(|v| &v.jurisdiction == jurisdiction)
    }

    fn admit(&self, jurisdiction: &JurisdictionId) -> Result<(), ConsensusError> {
        if self.status.is_terminal() {
            return Err(ConsensusError::ProposalClosed { proposal_id: self.id, status: self.status().name() });
        }
        if !self.is_participant(jurisdiction) {
            return Err(ConsensusError::Validation(format!(
                "{jurisdiction} is not a participant in proposal {}",
                self.id
            )));
        }
        if self.has_voted(jurisdiction) {
            return Err(ConsensusError::DuplicateVote { proposal_id: self.id, jurisdiction: jurisdiction.clone() });
        }
        Ok(())
    }
}

/// What the caller gets back from an accepted vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub proposal_id: ProposalId,
    pub jurisdiction: JurisdictionId,
    pub status: ProposalStatus,
    pub support_percent: u8,
    pub votes_cast: u32,
    pub ledger_index: u64,
}

/// Body of the vote-commitment ledger entry.
#[derive(Serialize)]
struct VotePayload<'a> {
    statement: &'a Statement,
    proof: &'a ProofArtifact,
}

#[derive(Default)]
struct ProposalTable {
    by_id: HashMap<ProposalId, Arc<Mutex<Proposal>>>,
    order: Vec<ProposalId>,
}

pub struct ConsensusEngine<G> {
    gate: G,
    ledger: Arc<CommitmentLedger>,
    registry: Arc<JurisdictionRegistry>,
    proposals: RwLock<ProposalTable>,
    rejected: Journal,
    clock: Arc<dyn Clock>,
}

impl<G> std::fmt::Debug for ConsensusEngine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("proposals", &self.proposals.read().order.len())
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl<G: ProofGate> ConsensusEngine<G> {
    pub fn new(gate: G, ledger: Arc<CommitmentLedger>, registry: Arc<JurisdictionRegistry>) -> Self {
        Self::with_clock(gate, ledger, registry, Arc::new(SystemClock))
    }

    pub fn with_clock(
        gate: G,
        ledger: Arc<CommitmentLedger>,
        registry: Arc<JurisdictionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate,
            ledger,
            registry,
            proposals: RwLock::new(ProposalTable::default()),
            rejected: Journal::default(),
            clock,
        }
    }

    /// Keep at most `max_entries` rejected attempts (oldest 10% trimmed).
    pub fn with_journal_capacity(mut self, max_entries: usize) -> Self {
        self.rejected = Journal::new(max_entries);
        self
    }

    /// Open a proposal over at least two distinct, registered and active
    /// jurisdictions. Participants are fixed from here on.
    pub fn open_proposal(
        &self,
        participants: Vec<JurisdictionId>,
        threshold: Threshold,
        description: impl Into<String>,
    ) -> Result<Proposal, ConsensusError> {
        if participants.len() < 2 {
            return Err(ConsensusError::Validation(format!(
                "a proposal needs at least 2 participants, got {}",
                participants.len()
            )));
        }
        let mut seen = HashSet::new();
        for j in &participants {
            if !seen.insert(j) {
                return Err(ConsensusError::Validation(format!("{j} is listed more than once")));
            }
            let member = self.registry.get(j).map_err(|e| match e {
                RegistryError::NotFound(id) => ConsensusError::JurisdictionNotFound(id),
                other => ConsensusError::Validation(other.to_string()),
            })?;
            if !member.active {
                return Err(ConsensusError::Validation(format!("{j} is inactive")));
            }
        }

        let count = u32::try_from(participants.len())
            .map_err(|_| ConsensusError::Validation("too many participants".into()))?;
        let proposal = Proposal {
            id: ProposalId::new(),
            description: description.into(),
            participants,
            threshold,
            votes: Vec::new(),
            tally: ProposalTally::new(count),
            status: Tracked::new(),
            opened_at: self.clock.now(),
        };

        let mut table = self.proposals.write();
        table.order.push(proposal.id);
        table.by_id.insert(proposal.id, Arc::new(Mutex::new(proposal.clone())));
        drop(table);

        tracing::info!(
            proposal_id = %proposal.id,
            participants = count,
            threshold = %proposal.threshold,
            "proposal opened"
        );
        Ok(proposal)
    }

    /// Submit a vote with its proof.
    ///
    /// Cancel-safe: nothing is written until the proof has been verified,
    /// and the write itself is synchronous.
    pub async fn cast_vote(
        &self,
        proposal_id: ProposalId,
        jurisdiction: &JurisdictionId,
        support: bool,
        proof: ProofArtifact,
    ) -> Result<VoteOutcome, ConsensusError> {
        let slot = self.slot(&proposal_id).map_err(|e| self.reject(proposal_id, jurisdiction, e))?;
        {
            let proposal = slot.lock();
            proposal.admit(jurisdiction).map_err(|e| self.reject(proposal_id, jurisdiction, e))?;
        }

        let statement = Statement::Vote { proposal_id, jurisdiction: jurisdiction.clone(), support };
        let verification = self.gate.verify(&statement, &proof).await;
        metrics::counter!("concord_proof_verifications_total", "outcome" => verification.outcome()).increment(1);
        if let Verification::Invalid(reason) = verification {
            if let VerificationFailure::VerifierUnavailable { attempts } = reason {
                tracing::warn!(%proposal_id, %jurisdiction, attempts, "vote verifier unavailable");
            }
            let err = ConsensusError::ProofInvalid { proposal_id, jurisdiction: jurisdiction.clone(), reason };
            return Err(self.reject(proposal_id, jurisdiction, err));
        }

        let nullifier = Nullifier::for_vote(&proposal_id, jurisdiction)
            .map_err(|e| self.reject(proposal_id, jurisdiction, ConsensusError::Validation(e.to_string())))?;
        let payload = Commitment::of(&VotePayload { statement: &statement, proof: &proof })
            .map_err(|e| self.reject(proposal_id, jurisdiction, ConsensusError::Validation(e.to_string())))?;

        let mut proposal = slot.lock();
        proposal.admit(jurisdiction).map_err(|e| self.reject(proposal_id, jurisdiction, e))?;

        let entry = match self.ledger.append(EntryType::VoteCommitment, payload, nullifier) {
            Ok(entry) => entry,
            Err(AppendError::NullifierReused { .. }) => {
                let err = ConsensusError::DuplicateVote { proposal_id, jurisdiction: jurisdiction.clone() };
                return Err(self.reject(proposal_id, jurisdiction, err));
            }
            Err(e) => {
                return Err(self.reject(proposal_id, jurisdiction, ConsensusError::Validation(e.to_string())));
            }
        };

        if let Err(e) = proposal.tally.record(support) {
            // admit() already ruled this out.
            return Err(self.reject(proposal_id, jurisdiction, ConsensusError::Validation(e.to_string())));
        }
        proposal.votes.push(Vote {
            jurisdiction: jurisdiction.clone(),
            support,
            proof,
            accepted_at: entry.committed_at,
            ledger_index: entry.index,
        });

        let verdict = proposal.tally.verdict(proposal.threshold);
        if verdict != proposal.status() {
            let reason = format!(
                "{}% support of {} participants against {} threshold",
                proposal.tally.support_percent(),
                proposal.tally.participants,
                proposal.threshold
            );
            if proposal.status.try_transition(verdict, entry.committed_at, reason).is_ok() {
                tracing::info!(
                    %proposal_id,
                    status = verdict.name(),
                    support_percent = proposal.tally.support_percent(),
                    votes_cast = proposal.tally.cast,
                    "proposal finalized"
                );
            }
        }

        let outcome = VoteOutcome {
            proposal_id,
            jurisdiction: jurisdiction.clone(),
            status: proposal.status(),
            support_percent: proposal.tally.support_percent(),
            votes_cast: proposal.tally.cast,
            ledger_index: entry.index,
        };
        drop(proposal);

        metrics::counter!("concord_votes_total", "outcome" => "accepted").increment(1);
        tracing::debug!(%proposal_id, %jurisdiction, support, ledger_index = entry.index, "vote accepted");
        Ok(outcome)
    }

    pub fn proposal(&self, id: &ProposalId) -> Result<Proposal, ConsensusError> {
        Ok(self.slot(id)?.lock().clone())
    }

    /// Every proposal, oldest first.
    pub fn proposals(&self) -> Vec<Proposal> {
        let slots: Vec<_> = {
            let table = self.proposals.read();
            table.order.iter().filter_map(|id| table.by_id.get(id).cloned()).collect()
        };
        slots.iter().map(|slot| slot.lock().clone()).collect()
    }

    pub fn rejected_attempts(&self) -> Vec<RejectedAttempt> {
        self.rejected.snapshot()
    }

    pub fn ledger(&self) -> &Arc<CommitmentLedger> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<JurisdictionRegistry> {
        &self.registry
    }

    fn slot(&self, id: &ProposalId) -> Result<Arc<Mutex<Proposal>>, ConsensusError> {
        self.proposals.read().by_id.get(id).cloned().ok_or(ConsensusError::ProposalNotFound(*id))
    }

    fn reject(&self, proposal_id: ProposalId, jurisdiction: &JurisdictionId, err: ConsensusError) -> ConsensusError {
        let code = err.code();
        metrics::counter!("concord_votes_total", "outcome" => code).increment(1);
        tracing::warn!(%proposal_id, %jurisdiction, code, error = %err, "vote rejected");
        self.rejected.record(RejectedAttempt {
            at: self.clock.now(),
            target: proposal_id.to_string(),
            submitter: Some(jurisdiction.to_string()),
            code,
            reason: err.to_string(),
        });
        err
    }
}
