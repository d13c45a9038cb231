//! # Statements and Proof Artifacts
//!
//! A [`Statement`] is the claim a proof must establish. Its canonical
//! encoding (JCS, sorted keys) is what gets hashed or signed, so two nodes
//! that build the same claim from fields supplied in a different order
//! still agree byte for byte.

use std::collections::BTreeMap;

use concord_core::{ActionId, CanonicalBytes, CanonicalizationError, JurisdictionId, ProposalId};
use concord_crypto::{hex, Commitment};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A claim submitted for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    /// `jurisdiction` casts `support` on `proposal_id`.
    Vote {
        proposal_id: ProposalId,
        jurisdiction: JurisdictionId,
        support: bool,
    },
    /// Action `action_id`, described by `commitments`, is authentic as
    /// attested by `attestor`.
    ReceiptAuthenticity {
        action_id: ActionId,
        attestor: JurisdictionId,
        commitments: BTreeMap<String, Commitment>,
    },
}

impl Statement {
    /// The jurisdiction whose proof is expected.
    pub fn subject(&self) -> &JurisdictionId {
        match self {
            Self::Vote { jurisdiction, .. } => jurisdiction,
            Self::ReceiptAuthenticity { attestor, .. } => attestor,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vote { .. } => "vote",
            Self::ReceiptAuthenticity { .. } => "receipt_authenticity",
        }
    }

    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vote { proposal_id, jurisdiction, support } => {
                write!(f, "{jurisdiction} votes {support} on {proposal_id}")
            }
            Self::ReceiptAuthenticity { action_id, attestor, commitments } => write!(
                f,
                "action {action_id} with {} commitments is authentic (attested by {attestor})",
                commitments.len()
            ),
        }
    }
}

/// Opaque proof bytes. Hex on the wire.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ProofArtifact(Vec<u8>);

impl ProofArtifact {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        hex::decode(s).map(Self)
    }
}

impl std::fmt::Debug for ProofArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = &self.0[..self.0.len().min(4)];
        write!(f, "ProofArtifact({}.., {} bytes)", hex::encode(shown), self.0.len())
    }
}

impl Serialize for ProofArtifact {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProofArtifact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
