//! # Digest-Binding Gate
//!
//! The artifact is `SHA256(JCS{"domain": "concord.attest.v1", "statement": s})`.
//! Anyone can produce it, so it proves only that the submitter saw the
//! exact statement, not who they are. It provides no zero knowledge.
//! It is the transparent stand-in until a real proof system is wired
//! behind [`ProofGate`].

use concord_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
use serde::Serialize;

use crate::gate::{ProofGate, Verification, VerificationFailure};
use crate::statement::{ProofArtifact, Statement};

const ATTEST_DOMAIN: &str = "concord.attest.v1";

#[derive(Serialize)]
struct Attestation<'a> {
    domain: &'static str,
    statement: &'a Statement,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DigestBindingGate;

impl DigestBindingGate {
    pub fn new() -> Self {
        Self
    }

    fn binding(statement: &Statement) -> Result<ContentDigest, CanonicalizationError> {
        let cb = CanonicalBytes::new(&Attestation { domain: ATTEST_DOMAIN, statement })?;
        Ok(sha256_digest(&cb))
    }

    /// Produce the artifact this gate accepts for `statement`.
    pub fn attest(statement: &Statement) -> Result<ProofArtifact, CanonicalizationError> {
        Ok(ProofArtifact::new(Self::binding(statement)?.as_bytes().to_vec()))
    }

    fn check(statement: &Statement, artifact: &ProofArtifact) -> Verification {
        if artifact.len() != 32 {
            return VerificationFailure::malformed(format!(
                "expected a 32-byte digest, got {} bytes",
                artifact.len()
            ))
            .into();
        }
        match Self::binding(statement) {
            Ok(expected) if expected.as_bytes().as_slice() == artifact.as_bytes() => Verification::Valid,
            Ok(_) => VerificationFailure::StatementMismatch.into(),
            Err(e) => VerificationFailure::malformed(format!("statement not canonicalizable: {e}")).into(),
        }
    }
}

impl ProofGate for DigestBindingGate {
    async fn verify(&self, statement: &Statement, artifact: &ProofArtifact) -> Verification {
        Self::check(statement, artifact)
    }
}
