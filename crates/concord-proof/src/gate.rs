//! # The ProofGate Contract

use std::future::Future;
use std::sync::Arc;

use concord_core::JurisdictionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statement::{ProofArtifact, Statement};

/// Why a proof was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum VerificationFailure {
    /// The artifact has the wrong shape for this gate.
    #[error("malformed proof: {detail}")]
    MalformedProof { detail: String },

    /// The artifact is well-formed but does not prove this statement.
    #[error("proof does not match statement")]
    StatementMismatch,

    /// No verification material is registered for the statement's subject.
    #[error("no verification key registered for {jurisdiction}")]
    UnknownSubject { jurisdiction: JurisdictionId },

    /// The backing verifier could not be reached within the retry budget.
    #[error("verifier unavailable after {attempts} attempt(s)")]
    VerifierUnavailable { attempts: u32 },
}

impl VerificationFailure {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedProof { detail: detail.into() }
    }

    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedProof { .. } => "malformed_proof",
            Self::StatementMismatch => "statement_mismatch",
            Self::UnknownSubject { .. } => "unknown_subject",
            Self::VerifierUnavailable { .. } => "verifier_unavailable",
        }
    }
}

/// Result of checking a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verification {
    Valid,
    Invalid(VerificationFailure),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn failure(&self) -> Option<&VerificationFailure> {
        match self {
            Self::Valid => None,
            Self::Invalid(f) => Some(f),
        }
    }

    /// Metric/log label: `valid` or the failure code.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid(f) => f.code(),
        }
    }
}

impl From<VerificationFailure> for Verification {
    fn from(f: VerificationFailure) -> Self {
        Self::Invalid(f)
    }
}

/// Verifies a proof artifact against a statement.
///
/// Implementations must be deterministic for identical inputs and must
/// not mutate shared state. The returned future may be dropped at any
/// point.
pub trait ProofGate: Send + Sync {
    fn verify(
        &self,
        statement: &Statement,
        artifact: &ProofArtifact,
    ) -> impl Future<Output = Verification> + Send;
}

impl<G: ProofGate> ProofGate for Arc<G> {
    async fn verify(&self, statement: &Statement, artifact: &ProofArtifact) -> Verification {
        (**self).verify(statement, artifact).await
    }
}

/// A gate that returns the same verdict for every input.
///
/// Useful for wiring tests and for dry runs where proofs are checked
/// elsewhere; never use `FixedGate::accept_all()` in a federation that
/// relies on proofs.
#[derive(Debug, Clone)]
pub struct FixedGate {
    verdict: Verification,
}

impl FixedGate {
    pub fn accept_all() -> Self {
        Self { verdict: Verification::Valid }
    }

    pub fn reject_all(failure: VerificationFailure) -> Self {
        Self { verdict: Verification::Invalid(failure) }
    }
}

impl ProofGate for FixedGate {
    async fn verify(&self, _statement: &Statement, _artifact: &ProofArtifact) -> Verification {
        self.verdict.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::ProposalId;

    fn statement() -> Statement {
        Statement::Vote {
            proposal_id: ProposalId::new(),
            jurisdiction: JurisdictionId::new("FR").unwrap(),
            support: true,
        }
    }

    #[test]
    fn failure_codes_are_stable() {
        assert_eq!(VerificationFailure::StatementMismatch.code(), "statement_mismatch");
        assert_eq!(VerificationFailure::VerifierUnavailable { attempts: 3 }.code(), "verifier_unavailable");
        assert_eq!(Verification::Valid.outcome(), "valid");
    }

    #[test]
    fn verification_serializes_with_reason() {
        let v = Verification::Invalid(VerificationFailure::VerifierUnavailable { attempts: 2 });
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["verdict"], "invalid");
        assert_eq!(json["reason"], "verifier_unavailable");
        assert_eq!(json["attempts"], 2);
    }

    #[tokio::test]
    async fn fixed_gate_returns_its_verdict() {
        let art = ProofArtifact::default();
        assert!(FixedGate::accept_all().verify(&statement(), &art).await.is_valid());
        let gate = FixedGate::reject_all(VerificationFailure::StatementMismatch);
        assert_eq!(
            gate.verify(&statement(), &art).await,
            Verification::Invalid(VerificationFailure::StatementMismatch)
        );
    }

    #[tokio::test]
    async fn arc_gate_delegates() {
        let gate = Arc::new(FixedGate::accept_all());
        assert!(gate.verify(&statement(), &ProofArtifact::default()).await.is_valid());
    }
}
