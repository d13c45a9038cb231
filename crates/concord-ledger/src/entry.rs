//! # Ledger Entries
//!
//! ```text
//! leaf_digest = SHA256(JCS{committed_at, entry_type, index, nullifier,
//!                          parent_hash, payload_commitment})
//! merkle_root = MMR root over leaf_digest[0..=index]
//! entry_hash  = SHA256(JCS{leaf_digest, merkle_root})
//! ```

use concord_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest, DigestAlgorithm, Timestamp,
};
use concord_crypto::{Commitment, Nullifier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    VoteCommitment,
    Receipt,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoteCommitment => "vote_commitment",
            Self::Receipt => "receipt",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parent hash of entry 0.
pub fn genesis_parent() -> ContentDigest {
    ContentDigest::new(DigestAlgorithm::Sha256, [0u8; 32])
}

/// One committed ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub index: u64,
    pub entry_type: EntryType,
    pub payload_commitment: Commitment,
    pub nullifier: Nullifier,
    pub parent_hash: ContentDigest,
    pub merkle_root: ContentDigest,
    pub committed_at: Timestamp,
    pub entry_hash: ContentDigest,
}

#[derive(Serialize)]
struct LeafPreimage<'a> {
    index: u64,
    entry_type: EntryType,
    payload_commitment: &'a Commitment,
    nullifier: &'a Nullifier,
    parent_hash: &'a ContentDigest,
    committed_at: &'a Timestamp,
}

#[derive(Serialize)]
struct HashPreimage<'a> {
    leaf_digest: &'a ContentDigest,
    merkle_root: &'a ContentDigest,
}

pub(crate) fn compute_leaf_digest(
    index: u64,
    entry_type: EntryType,
    payload_commitment: &Commitment,
    nullifier: &Nullifier,
    parent_hash: &ContentDigest,
    committed_at: &Timestamp,
) -> Result<ContentDigest, CanonicalizationError> {
    let cb = CanonicalBytes::new(&LeafPreimage {
        index,
        entry_type,
        payload_commitment,
        nullifier,
        parent_hash,
        committed_at,
    })?;
    Ok(sha256_digest(&cb))
}

pub(crate) fn compute_entry_hash(
    leaf_digest: &ContentDigest,
    merkle_root: &ContentDigest,
) -> Result<ContentDigest, CanonicalizationError> {
    Ok(sha256_digest(&CanonicalBytes::new(&HashPreimage { leaf_digest, merkle_root })?))
}

impl LedgerEntry {
    /// Digest of the entry's content fields (the MMR leaf input).
    pub fn leaf_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        compute_leaf_digest(
            self.index,
            self.entry_type,
            &self.payload_commitment,
            &self.nullifier,
            &self.parent_hash,
            &self.committed_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LedgerEntry {
        LedgerEntry {
            index: 0,
            entry_type: EntryType::Receipt,
            payload_commitment: Commitment::of(&"payload").unwrap(),
            nullifier: Nullifier::derive("test", &"n").unwrap(),
            parent_hash: genesis_parent(),
            merkle_root: genesis_parent(),
            committed_at: Timestamp::parse("2026-02-01T10:00:00Z").unwrap(),
            entry_hash: genesis_parent(),
        }
    }

    #[test]
    fn genesis_is_all_zero_hex() {
        assert_eq!(genesis_parent().to_hex(), "0".repeat(64));
    }

    #[test]
    fn leaf_digest_covers_content_fields() {
        let a = entry();
        let mut b = entry();
        b.payload_commitment = Commitment::of(&"other").unwrap();
        assert_ne!(a.leaf_digest().unwrap(), b.leaf_digest().unwrap());

        let mut c = entry();
        c.index = 1;
        assert_ne!(a.leaf_digest().unwrap(), c.leaf_digest().unwrap());
    }

    #[test]
    fn leaf_digest_ignores_derived_fields() {
        let a = entry();
        let mut b = entry();
        b.merkle_root = Commitment::of(&1u8).unwrap().digest().to_owned();
        b.entry_hash = b.merkle_root;
        assert_eq!(a.leaf_digest().unwrap(), b.leaf_digest().unwrap());
    }

    #[test]
    fn entry_type_wire_names() {
        assert_eq!(serde_json::to_string(&EntryType::VoteCommitment).unwrap(), "\"vote_commitment\"");
        assert_eq!(EntryType::Receipt.to_string(), "receipt");
    }
}
