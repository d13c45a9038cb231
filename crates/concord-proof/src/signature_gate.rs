//! # Signature Gate
//!
//! The artifact is an Ed25519 signature over the statement's canonical
//! bytes, made with the key registered for the statement's subject.

use std::sync::Arc;

use concord_core::{CanonicalizationError, JurisdictionId};
use concord_crypto::{verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

use crate::gate::{ProofGate, Verification, VerificationFailure};
use crate::statement::{ProofArtifact, Statement};

/// Looks up a jurisdiction's verifying key.
pub trait KeyResolver: Send + Sync {
    fn verifying_key(&self, jurisdiction: &JurisdictionId) -> Option<Ed25519PublicKey>;
}

impl<R: KeyResolver + ?Sized> KeyResolver for Arc<R> {
    fn verifying_key(&self, jurisdiction: &JurisdictionId) -> Option<Ed25519PublicKey> {
        (**self).verifying_key(jurisdiction)
    }
}

#[derive(Debug, Clone)]
pub struct SignatureGate<R> {
    keys: R,
}

impl<R: KeyResolver> SignatureGate<R> {
    pub fn new(keys: R) -> Self {
        Self { keys }
    }

    fn check(&self, statement: &Statement, artifact: &ProofArtifact) -> Verification {
        let subject = statement.subject();
        let Some(key) = self.keys.verifying_key(subject) else {
            return VerificationFailure::UnknownSubject { jurisdiction: subject.clone() }.into();
        };
        let signature = match Ed25519Signature::from_slice(artifact.as_bytes()) {
            Ok(sig) => sig,
            Err(e) => return VerificationFailure::malformed(e.to_string()).into(),
        };
        let message = match statement.canonical_bytes() {
            Ok(cb) => cb,
            Err(e) => return VerificationFailure::malformed(e.to_string()).into(),
        };
        match verify_with_public_key(&message, &signature, &key) {
            Ok(()) => Verification::Valid,
            Err(_) => VerificationFailure::StatementMismatch.into(),
        }
    }
}

impl<R: KeyResolver> ProofGate for SignatureGate<R> {
    async fn verify(&self, statement: &Statement, artifact: &ProofArtifact) -> Verification {
        self.check(statement, artifact)
    }
}

/// Produce the artifact a [`SignatureGate`] accepts.
pub fn sign_statement(
    key: &Ed25519KeyPair,
    statement: &Statement,
) -> Result<ProofArtifact, CanonicalizationError> {
    let sig = key.sign(&statement.canonical_bytes()?);
    Ok(ProofArtifact::new(sig.as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::ProposalId;
    use std::collections::HashMap;

    struct Keys(HashMap<JurisdictionId, Ed25519PublicKey>);

    impl KeyResolver for Keys {
        fn verifying_key(&self, j: &JurisdictionId) -> Option<Ed25519PublicKey> {
            self.0.get(j).cloned()
        }
    }

    fn setup() -> (Ed25519KeyPair, SignatureGate<Keys>, JurisdictionId) {
        let de = JurisdictionId::new("DE").unwrap();
        let kp = Ed25519KeyPair::from_seed(&[3; 32]);
        let gate = SignatureGate::new(Keys(HashMap::from([(de.clone(), kp.public_key())])));
        (kp, gate, de)
    }

    fn vote(j: &JurisdictionId, support: bool) -> Statement {
        Statement::Vote { proposal_id: ProposalId::new(), jurisdiction: j.clone(), support }
    }

    #[tokio::test]
    async fn signed_by_registered_key_is_valid() {
        let (kp, gate, de) = setup();
        let s = vote(&de, true);
        let art = sign_statement(&kp, &s).unwrap();
        assert!(gate.verify(&s, &art).await.is_valid());
    }

    #[tokio::test]
    async fn signature_by_other_key_mismatches() {
        let (_, gate, de) = setup();
        let s = vote(&de, true);
        let art = sign_statement(&Ed25519KeyPair::from_seed(&[9; 32]), &s).unwrap();
        assert_eq!(gate.verify(&s, &art).await.outcome(), "statement_mismatch");
    }

    #[tokio::test]
    async fn unknown_subject_reported() {
        let (kp, gate, _) = setup();
        let s = vote(&JurisdictionId::new("FR").unwrap(), true);
        let art = sign_statement(&kp, &s).unwrap();
        assert_eq!(gate.verify(&s, &art).await.outcome(), "unknown_subject");
    }

    #[tokio::test]
    async fn truncated_signature_is_malformed() {
        let (_, gate, de) = setup();
        let v = gate.verify(&vote(&de, false), &ProofArtifact::new(vec![0; 12])).await;
        assert_eq!(v.outcome(), "malformed_proof");
    }
}
