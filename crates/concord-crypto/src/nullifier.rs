//! # Nullifiers
//!
//! A nullifier is a deterministic digest that marks one vote or one
//! action as spent. It is derived only from the identifying parts of the
//! claim, so resubmitting the same claim (with a different proof, a
//! different support flag, or different amounts) yields the same
//! nullifier and is caught by the ledger.
//!
//! `derive(domain, parts) = SHA256(JCS{"domain": domain, "parts": parts})`

use concord_core::{
    sha256_digest, ActionId, CanonicalBytes, CanonicalizationError, ContentDigest, JurisdictionId,
    ProposalId, Timestamp,
};
use serde::{Deserialize, Serialize};

pub const VOTE_DOMAIN: &str = "concord.vote";
pub const RECEIPT_DOMAIN: &str = "concord.receipt";

#[derive(Serialize)]
struct Preimage<'a, T: Serialize + ?Sized> {
    domain: &'a str,
    parts: &'a T,
}

/// Spent-marker digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nullifier(ContentDigest);

impl Nullifier {
    pub fn derive<T: Serialize + ?Sized>(
        domain: &str,
        parts: &T,
    ) -> Result<Self, CanonicalizationError> {
        let cb = CanonicalBytes::new(&Preimage { domain, parts })?;
        Ok(Self(sha256_digest(&cb)))
    }

    /// One vote per (proposal, jurisdiction).
    pub fn for_vote(
        proposal: &ProposalId,
        jurisdiction: &JurisdictionId,
    ) -> Result<Self, CanonicalizationError> {
        Self::derive(VOTE_DOMAIN, &(proposal, jurisdiction))
    }

    /// One receipt per (action id, action timestamp).
    pub fn for_receipt(
        action: &ActionId,
        timestamp: &Timestamp,
    ) -> Result<Self, CanonicalizationError> {
        Self::derive(RECEIPT_DOMAIN, &(action, timestamp))
    }

    pub fn from_digest(digest: ContentDigest) -> Self {
        Self(digest)
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.0
    }
}

impl std::fmt::Display for Nullifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}
