//! # Federation Errors
//!
//! Every rejection the services return carries a stable reason code via
//! `code()`. All of these are recoverable; the only fatal condition in the
//! system is a ledger integrity fault, which verification reports rather
//! than returns as an error.

use std::path::PathBuf;

use concord_core::{ActionId, JurisdictionId, ProposalId, ReceiptId};
use concord_crypto::Nullifier;
use concord_proof::VerificationFailure;
use concord_state::ThresholdError;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Errors loading or validating a [`FederationConfig`](crate::FederationConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read federation config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse federation config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// `field` is a path into the document, e.g. `jurisdictions[1].code`.
    #[error("invalid federation config: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("jurisdiction {0} is already registered")]
    DuplicateJurisdiction(JurisdictionId),

    #[error("jurisdiction {0} not found")]
    NotFound(JurisdictionId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateJurisdiction(_) => "duplicate_jurisdiction",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "validation_error",
        }
    }
}

// ---------------------------------------------------------------------------
// Consensus
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Malformed input, rejected before any state change.
    #[error("validation error: {0}")]
    Validation(String),

    /// The proof gate did not accept the vote. An unreachable verifier
    /// lands here too, with its own code.
    #[error("proof rejected for {jurisdiction} on proposal {proposal_id}: {reason}")]
    ProofInvalid { proposal_id: ProposalId, jurisdiction: JurisdictionId, reason: VerificationFailure },

    #[error("{jurisdiction} has already voted on proposal {proposal_id}")]
    DuplicateVote { proposal_id: ProposalId, jurisdiction: JurisdictionId },

    #[error("proposal {proposal_id} is closed ({status})")]
    ProposalClosed { proposal_id: ProposalId, status: &'static str },

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("jurisdiction {0} not found")]
    JurisdictionNotFound(JurisdictionId),
}

impl ConsensusError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::ProofInvalid { reason: VerificationFailure::VerifierUnavailable { .. }, .. } => {
                "verifier_unavailable"
            }
            Self::ProofInvalid { .. } => "proof_invalid",
            Self::DuplicateVote { .. } => "duplicate_vote",
            Self::ProposalClosed { .. } => "proposal_closed",
            Self::ProposalNotFound(_) | Self::JurisdictionNotFound(_) => "not_found",
        }
    }
}

impl From<ThresholdError> for ConsensusError {
    fn from(e: ThresholdError) -> Self {
        Self::Validation(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("proof rejected for action {action_id}: {reason}")]
    ProofInvalid { action_id: ActionId, reason: VerificationFailure },

    /// A receipt for this action (same id and timestamp) already exists.
    #[error("action {action_id} already has a receipt (nullifier {nullifier}, ledger entry {first_index})")]
    NullifierReused { action_id: ActionId, nullifier: Nullifier, first_index: u64 },

    #[error("receipt {0} not found")]
    NotFound(ReceiptId),
}

impl ReceiptError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::ProofInvalid { reason: VerificationFailure::VerifierUnavailable { .. }, .. } => {
                "verifier_unavailable"
            }
            Self::ProofInvalid { .. } => "proof_invalid",
            Self::NullifierReused { .. } => "nullifier_reused",
            Self::NotFound(_) => "not_found",
        }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum FederationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
