//! # Receipt Service
//!
//! Issues tamper-evident receipts for discrete actions (withdrawals,
//! transfers, deposits) and re-verifies them on demand.
//!
//! ## Issuance
//!
//! Issuance has two phases, because the attestor must sign over
//! commitments that only exist once their blindings are drawn:
//!
//! 1. [`ReceiptService::prepare`] validates the action, rejects
//!    future-dated timestamps beyond the skew tolerance, commits to
//!    amount, recipient and purpose under fresh blindings, and derives
//!    `Nullifier::for_receipt(action id, timestamp)`. The result carries
//!    the [`Statement`] the attestor must prove.
//! 2. [`ReceiptService::issue`] checks the proof through the gate, then
//!    appends a `Receipt` ledger entry. The ledger's atomic nullifier
//!    check is what finally rules out a second receipt for the same
//!    action.
//!
//! [`ReceiptService::issue_receipt`] runs both with a synchronous attestor.
//!
//! ## Verification
//!
//! [`ReceiptService::verify_receipt`] rechecks four things and reports
//! every one that fails:
//!
//! | Check | Passes when |
//! |---|---|
//! | `chain_integrity` | the chain verifies from genesis through the receipt's entry |
//! | `nullifier_uniqueness` | the nullifier is recomputable from the action and appears in exactly one entry, the receipt's own |
//! | `commitment_match` | field commitments and the entry's payload commitment recompute from the action |
//! | `timestamp` | the action is not dated beyond now plus the skew tolerance |
//!
//! The first verification settles the receipt's status (`verified` or
//! `failed`); later verifications report but never change it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use concord_core::{ActionId, Clock, ContentDigest, JurisdictionId, ReceiptId, SystemClock, Timestamp};
use concord_crypto::{Blinding, Commitment, Nullifier, Opening};
use concord_ledger::{AppendError, CommitmentLedger, EntryType};
use concord_proof::{ProofArtifact, ProofGate, Statement, Verification, VerificationFailure};
use concord_state::{ReceiptStatus, Tracked};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::ReceiptConfig;
use crate::error::ReceiptError;
use crate::journal::{Journal, RejectedAttempt};

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Withdrawal,
    Transfer,
    Deposit,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Deposit => "deposit",
        }
    }
}

/// The action a receipt is issued for. `amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub amount: u64,
    pub currency: String,
    pub recipient: String,
    pub purpose: String,
    pub timestamp: Timestamp,
    pub attestor: JurisdictionId,
}

/// A committed receipt field, disclosable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptField {
    Amount,
    Recipient,
    Purpose,
}

impl ReceiptField {
    pub const ALL: [ReceiptField; 3] = [Self::Amount, Self::Recipient, Self::Purpose];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Recipient => "recipient",
            Self::Purpose => "purpose",
        }
    }
}

impl SubjectAction {
    fn field_value(&self, field: ReceiptField) -> serde_json::Value {
        match field {
            ReceiptField::Amount => serde_json::json!({ "amount": self.amount, "currency": self.currency }),
            ReceiptField::Recipient => serde_json::Value::String(self.recipient.clone()),
            ReceiptField::Purpose => serde_json::Value::String(self.purpose.clone()),
        }
    }

    fn validate(&self) -> Result<(), ReceiptError> {
        if self.amount == 0 {
            return Err(ReceiptError::Validation("amount must be greater than zero".into()));
        }
        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ReceiptError::Validation(format!(
                "currency must be a 3-letter upper-case code, got {:?}",
                self.currency
            )));
        }
        if self.recipient.trim().is_empty() {
            return Err(ReceiptError::Validation("recipient must not be empty".into()));
        }
        Ok(())
    }

    fn opening(&self, field: ReceiptField, blinding: Blinding) -> Result<Opening, ReceiptError> {
        Opening::new(field.as_str(), &self.field_value(field), blinding)
            .map_err(|e| ReceiptError::Validation(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// An issued receipt. Content is fixed at issuance; only `status` moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub action_id: ActionId,
    pub kind: ActionKind,
    pub attestor: JurisdictionId,
    pub action_timestamp: Timestamp,
    pub commitments: BTreeMap<ReceiptField, Commitment>,
    pub nullifier: Nullifier,
    pub ledger_index: u64,
    /// Ledger merkle root as of this receipt's entry.
    pub merkle_root: ContentDigest,
    pub proof: ProofArtifact,
    pub status: Tracked<ReceiptStatus>,
    pub issued_at: Timestamp,
}

/// Output of [`ReceiptService::prepare`]: commitments drawn, proof pending.
#[derive(Debug, Clone)]
pub struct PreparedReceipt {
    id: ReceiptId,
    action: SubjectAction,
    openings: BTreeMap<ReceiptField, Opening>,
    commitments: BTreeMap<ReceiptField, Commitment>,
    nullifier: Nullifier,
    statement: Statement,
}

impl PreparedReceipt {
    pub fn receipt_id(&self) -> ReceiptId {
        self.id
    }

    pub fn action(&self) -> &SubjectAction {
        &self.action
    }

    /// What the attestor has to prove.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn commitments(&self) -> &BTreeMap<ReceiptField, Commitment> {
        &self.commitments
    }

    pub fn nullifier(&self) -> &Nullifier {
        &self.nullifier
    }
}

fn keyed(commitments: &BTreeMap<ReceiptField, Commitment>) -> BTreeMap<String, Commitment> {
    commitments.iter().map(|(field, c)| (field.as_str().to_string(), *c)).collect()
}

fn authenticity_statement(action: &SubjectAction, commitments: &BTreeMap<ReceiptField, Commitment>) -> Statement {
    Statement::ReceiptAuthenticity {
        action_id: action.id.clone(),
        attestor: action.attestor.clone(),
        commitments: keyed(commitments),
    }
}

/// Body of the receipt ledger entry.
#[derive(Serialize)]
struct ReceiptPayload<'a> {
    receipt_id: ReceiptId,
    action_id: &'a ActionId,
    kind: ActionKind,
    attestor: &'a JurisdictionId,
    timestamp: &'a Timestamp,
    commitments: BTreeMap<String, Commitment>,
}

fn payload_commitment(id: ReceiptId, action: &SubjectAction, commitments: &BTreeMap<ReceiptField, Commitment>) -> Result<Commitment, ReceiptError> {
    Commitment::of(&ReceiptPayload {
        receipt_id: id,
        action_id: &action.id,
        kind: action.kind,
        attestor: &action.attestor,
        timestamp: &action.timestamp,
        commitments: keyed(commitments),
    })
    .map_err(|e| ReceiptError::Validation(e.to_string()))
}

// ---------------------------------------------------------------------------
// Verification results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptCheck {
    ChainIntegrity,
    NullifierUniqueness,
    CommitmentMatch,
    Timestamp,
}

impl ReceiptCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChainIntegrity => "chain_integrity",
            Self::NullifierUniqueness => "nullifier_uniqueness",
            Self::CommitmentMatch => "commitment_match",
            Self::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check: ReceiptCheck,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptVerification {
    pub receipt_id: ReceiptId,
    pub valid: bool,
    pub failures: Vec<CheckFailure>,
}

impl ReceiptVerification {
    pub fn failed(&self, check: ReceiptCheck) -> bool {
        self.failures.iter().any(|f| f.check == check)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BatchOutcome {
    Checked(ReceiptVerification),
    NotFound,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct ReceiptRecord {
    receipt: Receipt,
    action: SubjectAction,
    openings: BTreeMap<ReceiptField, Opening>,
}

#[derive(Default)]
struct ReceiptTable {
    by_id: HashMap<ReceiptId, ReceiptRecord>,
    order: Vec<ReceiptId>,
}

pub struct ReceiptService<G> {
    gate: G,
    ledger: Arc<CommitmentLedger>,
    receipts: RwLock<ReceiptTable>,
    rejected: Journal,
    clock: Arc<dyn Clock>,
    skew_tolerance_secs: i64,
}

impl<G> std::fmt::Debug for ReceiptService<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptService")
            .field("receipts", &self.receipts.read().order.len())
            .field("skew_tolerance_secs", &self.skew_tolerance_secs)
            .finish()
    }
}

impl<G: ProofGate> ReceiptService<G> {
    pub fn new(gate: G, ledger: Arc<CommitmentLedger>) -> Self {
        Self::with_config(gate, ledger, ReceiptConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(gate: G, ledger: Arc<CommitmentLedger>, config: ReceiptConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate,
            ledger,
            receipts: RwLock::new(ReceiptTable::default()),
            rejected: Journal::default(),
            clock,
            skew_tolerance_secs: i64::try_from(config.clock_skew_tolerance_secs).unwrap_or(i64::MAX),
        }
    }

    /// Keep at most `max_entries` rejected attempts (oldest 10% trimmed).
    pub fn with_journal_capacity(mut self, max_entries: usize) -> Self {
        self.rejected = Journal::new(max_entries);
        self
    }

    /// Validate `action` and draw its commitments.
    pub fn prepare(&self, action: SubjectAction) -> Result<PreparedReceipt, ReceiptError> {
        self.prepare_inner(&action).map_err(|e| self.reject(&action, e))
    }

    fn prepare_inner(&self, action: &SubjectAction) -> Result<PreparedReceipt, ReceiptError> {
        action.validate()?;
        let ahead = self.clock.now().seconds_until(&action.timestamp);
        if ahead > self.skew_tolerance_secs {
            return Err(ReceiptError::Validation(format!(
                "action timestamp {} is {ahead}s in the future",
                action.timestamp
            )));
        }

        let nullifier = Nullifier::for_receipt(&action.id, &action.timestamp)
            .map_err(|e| ReceiptError::Validation(e.to_string()))?;
        if let Some(existing) = self.ledger.nullifier_record(&nullifier) {
            return Err(ReceiptError::NullifierReused {
                action_id: action.id.clone(),
                nullifier,
                first_index: existing.entry_index,
            });
        }

        let mut openings = BTreeMap::new();
        let mut commitments = BTreeMap::new();
        for field in ReceiptField::ALL {
            let opening = action.opening(field, Blinding::random())?;
            let commitment = opening.commitment().map_err(|e| ReceiptError::Validation(e.to_string()))?;
            openings.insert(field, opening);
            commitments.insert(field, commitment);
        }
        let statement = authenticity_statement(action, &commitments);
        Ok(PreparedReceipt {
            id: ReceiptId::new(),
            action: action.clone(),
            openings,
            commitments,
            nullifier,
            statement,
        })
    }

    /// Check `proof` against the prepared statement and append the
    /// receipt entry. Cancel-safe: nothing is written before the gate
    /// returns.
    pub async fn issue(&self, prepared: PreparedReceipt, proof: ProofArtifact) -> Result<Receipt, ReceiptError> {
        let verification = self.gate.verify(&prepared.statement, &proof).await;
        metrics::counter!("concord_proof_verifications_total", "outcome" => verification.outcome()).increment(1);
        if let Verification::Invalid(reason) = verification {
            if let VerificationFailure::VerifierUnavailable { attempts } = reason {
                tracing::warn!(action_id = %prepared.action.id, attempts, "receipt verifier unavailable");
            }
            let err = ReceiptError::ProofInvalid { action_id: prepared.action.id.clone(), reason };
            return Err(self.reject(&prepared.action, err));
        }

        let PreparedReceipt { id, action, openings, commitments, nullifier, .. } = prepared;
        let payload = payload_commitment(id, &action, &commitments).map_err(|e| self.reject(&action, e))?;
        let entry = match self.ledger.append(EntryType::Receipt, payload, nullifier) {
            Ok(entry) => entry,
            Err(AppendError::NullifierReused { nullifier, first_index }) => {
                let err = ReceiptError::NullifierReused { action_id: action.id.clone(), nullifier, first_index };
                return Err(self.reject(&action, err));
            }
            Err(e) => return Err(self.reject(&action, ReceiptError::Validation(e.to_string()))),
        };

        let receipt = Receipt {
            id,
            action_id: action.id.clone(),
            kind: action.kind,
            attestor: action.attestor.clone(),
            action_timestamp: action.timestamp,
            commitments,
            nullifier,
            ledger_index: entry.index,
            merkle_root: entry.merkle_root,
            proof,
            status: Tracked::new(),
            issued_at: entry.committed_at,
        };

        let mut table = self.receipts.write();
        table.order.push(id);
        table.by_id.insert(id, ReceiptRecord { receipt: receipt.clone(), action, openings });
        drop(table);

        metrics::counter!("concord_receipts_issued_total").increment(1);
        tracing::info!(
            receipt_id = %id,
            action_id = %receipt.action_id,
            kind = receipt.kind.as_str(),
            ledger_index = receipt.ledger_index,
            "receipt issued"
        );
        Ok(receipt)
    }

    /// Prepare, attest with `attest`, and issue in one call.
    pub async fn issue_receipt<F, E>(&self, action: SubjectAction, attest: F) -> Result<Receipt, ReceiptError>
    where
        F: FnOnce(&Statement) -> Result<ProofArtifact, E>,
        E: std::fmt::Display,
    {
        let prepared = self.prepare(action)?;
        let proof = match attest(prepared.statement()) {
            Ok(proof) => proof,
            Err(e) => {
                let err = ReceiptError::Validation(format!("attestation failed: {e}"));
                return Err(self.reject(prepared.action(), err));
            }
        };
        self.issue(prepared, proof).await
    }

    pub fn receipt(&self, id: &ReceiptId) -> Result<Receipt, ReceiptError> {
        self.receipts
            .read()
            .by_id
            .get(id)
            .map(|r| r.receipt.clone())
            .ok_or(ReceiptError::NotFound(*id))
    }

    /// Every receipt, oldest first.
    pub fn receipts(&self) -> Vec<Receipt> {
        let table = self.receipts.read();
        table.order.iter().filter_map(|id| table.by_id.get(id)).map(|r| r.receipt.clone()).collect()
    }

    /// Reveal one committed field. The opening checks against the
    /// receipt's commitment for that field and says nothing about the
    /// others.
    pub fn disclose(&self, id: &ReceiptId, field: ReceiptField) -> Result<Opening, ReceiptError> {
        let table = self.receipts.read();
        let record = table.by_id.get(id).ok_or(ReceiptError::NotFound(*id))?;
        record
            .openings
            .get(&field)
            .cloned()
            .ok_or_else(|| ReceiptError::Validation(format!("field {} was not committed", field.as_str())))
    }

    pub fn verify_receipt(&self, id: &ReceiptId) -> Result<ReceiptVerification, ReceiptError> {
        let (receipt, action, openings) = {
            let table = self.receipts.read();
            let record = table.by_id.get(id).ok_or(ReceiptError::NotFound(*id))?;
            (record.receipt.clone(), record.action.clone(), record.openings.clone())
        };

        let failures = self.run_checks(&receipt, &action, &openings);
        let verification = ReceiptVerification { receipt_id: *id, valid: failures.is_empty(), failures };
        self.settle(&verification);
        Ok(verification)
    }

    /// Verify every id independently; one failure never stops the rest.
    pub fn batch_verify(&self, ids: &[ReceiptId]) -> BTreeMap<ReceiptId, BatchOutcome> {
        ids.iter()
            .map(|id| {
                let outcome = match self.verify_receipt(id) {
                    Ok(v) => BatchOutcome::Checked(v),
                    Err(_) => BatchOutcome::NotFound,
                };
                (*id, outcome)
            })
            .collect()
    }

    pub fn rejected_attempts(&self) -> Vec<RejectedAttempt> {
        self.rejected.snapshot()
    }

    pub fn ledger(&self) -> &Arc<CommitmentLedger> {
        &self.ledger
    }

    fn run_checks(
        &self,
        receipt: &Receipt,
        action: &SubjectAction,
        openings: &BTreeMap<ReceiptField, Opening>,
    ) -> Vec<CheckFailure> {
        let mut failures = Vec::new();
        let mut fail = |check, reason: String| failures.push(CheckFailure { check, reason });
        let index = receipt.ledger_index;

        // (i) chain
        match self.ledger.verify(index) {
            Ok(report) if report.is_valid() => {}
            Ok(report) => fail(
                ReceiptCheck::ChainIntegrity,
                format!(
                    "chain broken at entry {} ({} fault(s))",
                    report.first_invalid.unwrap_or(index),
                    report.faults.len()
                ),
            ),
            Err(e) => fail(ReceiptCheck::ChainIntegrity, e.to_string()),
        }
        let entry = self.ledger.entry(index);

        // (ii) nullifier
        match Nullifier::for_receipt(&action.id, &action.timestamp) {
            Ok(n) if n == receipt.nullifier => {}
            Ok(_) => fail(ReceiptCheck::NullifierUniqueness, "nullifier does not derive from the action".into()),
            Err(e) => fail(ReceiptCheck::NullifierUniqueness, e.to_string()),
        }
        let occurrences = self.ledger.nullifier_occurrences(&receipt.nullifier);
        if occurrences != [index] {
            fail(
                ReceiptCheck::NullifierUniqueness,
                format!("nullifier recorded at entries {occurrences:?}, expected only {index}"),
            );
        }
        match self.ledger.nullifier_record(&receipt.nullifier) {
            Some(record) if record.entry_index == index => {}
            Some(record) => fail(
                ReceiptCheck::NullifierUniqueness,
                format!("nullifier belongs to entry {}", record.entry_index),
            ),
            None => fail(ReceiptCheck::NullifierUniqueness, "nullifier not registered".into()),
        }

        // (iii) commitments
        for field in ReceiptField::ALL {
            let recomputed = openings
                .get(&field)
                .and_then(|o| action.opening(field, o.blinding.clone()).ok())
                .and_then(|o| o.commitment().ok());
            if recomputed.is_none() || recomputed.as_ref() != receipt.commitments.get(&field) {
                fail(ReceiptCheck::CommitmentMatch, format!("{} commitment does not recompute", field.as_str()));
            }
        }
        match (&entry, payload_commitment(receipt.id, action, &receipt.commitments)) {
            (Some(entry), Ok(payload)) if entry.payload_commitment == payload => {}
            (Some(_), Ok(_)) => fail(ReceiptCheck::CommitmentMatch, "ledger payload commitment differs".into()),
            (None, _) => fail(ReceiptCheck::CommitmentMatch, format!("ledger entry {index} missing")),
            (_, Err(e)) => fail(ReceiptCheck::CommitmentMatch, e.to_string()),
        }
        if let Some(entry) = &entry {
            if entry.nullifier != receipt.nullifier {
                fail(ReceiptCheck::NullifierUniqueness, "ledger entry carries a different nullifier".into());
            }
        }

        // (iv) timestamp
        let ahead = self.clock.now().seconds_until(&action.timestamp);
        if ahead > self.skew_tolerance_secs {
            fail(ReceiptCheck::Timestamp, format!("action timestamp is {ahead}s in the future"));
        }

        failures
    }

    fn settle(&self, verification: &ReceiptVerification) {
        let mut table = self.receipts.write();
        let Some(record) = table.by_id.get_mut(&verification.receipt_id) else {
            return;
        };
        if record.receipt.status.is_terminal() {
            return;
        }
        let (to, reason) = if verification.valid {
            (ReceiptStatus::Verified, "all checks passed".to_string())
        } else {
            let failed: Vec<_> = verification.failures.iter().map(|f| f.check.as_str()).collect();
            (ReceiptStatus::Failed, format!("failed: {}", failed.join(", ")))
        };
        if record.receipt.status.try_transition(to, self.clock.now(), reason).is_ok() && !verification.valid {
            tracing::warn!(
                receipt_id = %verification.receipt_id,
                failures = verification.failures.len(),
                "receipt failed verification"
            );
        }
    }

    fn reject(&self, action: &SubjectAction, err: ReceiptError) -> ReceiptError {
        let code = err.code();
        tracing::warn!(action_id = %action.id, attestor = %action.attestor, code, error = %err, "receipt rejected");
        self.rejected.record(RejectedAttempt {
            at: self.clock.now(),
            target: action.id.to_string(),
            submitter: Some(action.attestor.to_string()),
            code,
            reason: err.to_string(),
        });
        err
    }
}
