//! # Commitments
//!
//! A [`Commitment`] binds to a value without revealing it. Receipts commit
//! to amount, recipient and purpose separately, each under its own random
//! [`Blinding`], so a holder can later disclose one field (by handing out
//! its [`Opening`]) while the others stay hidden.
//!
//! ```text
//! commit(label, value, r) = SHA256(JCS{"blinding": hex(r), "domain": "concord.commitment.v1",
//!                                      "label": label, "value": value})
//! ```
//!
//! [`Commitment::of`] is the unblinded form used as a ledger payload
//! commitment ("hash of subject data"); it hides nothing from anyone who
//! can guess the value and must not be used for disclosable fields.

use concord_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hex;

const BLINDED_DOMAIN: &str = "concord.commitment.v1";
const PAYLOAD_DOMAIN: &str = "concord.payload.v1";

/// 32 bytes of commitment randomness.
#[derive(Clone, PartialEq, Eq)]
pub struct Blinding([u8; 32]);

impl Blinding {
    /// Fresh randomness from the OS CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl std::fmt::Debug for Blinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Blinding(<redacted>)")
    }
}

impl Serialize for Blinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Blinding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode_array::<32>(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize)]
struct BlindedPreimage<'a, T: Serialize + ?Sized> {
    domain: &'static str,
    label: &'a str,
    value: &'a T,
    blinding: String,
}

#[derive(Serialize)]
struct PayloadPreimage<'a, T: Serialize + ?Sized> {
    domain: &'static str,
    value: &'a T,
}

/// A one-way binding to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(ContentDigest);

impl Commitment {
    /// Blinded, labelled commitment to `value`.
    pub fn commit<T: Serialize + ?Sized>(
        label: &str,
        value: &T,
        blinding: &Blinding,
    ) -> Result<Self, CanonicalizationError> {
        let preimage = BlindedPreimage {
            domain: BLINDED_DOMAIN,
            label,
            value,
            blinding: blinding.to_hex(),
        };
        Ok(Self(sha256_digest(&CanonicalBytes::new(&preimage)?)))
    }

    /// Unblinded digest of `value`.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, CanonicalizationError> {
        let preimage = PayloadPreimage { domain: PAYLOAD_DOMAIN, value };
        Ok(Self(sha256_digest(&CanonicalBytes::new(&preimage)?)))
    }

    pub fn from_digest(digest: ContentDigest) -> Self {
        Self(digest)
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.0
    }

    /// Whether `opening` reveals the value this commitment binds to.
    pub fn verify_opening(&self, opening: &Opening) -> bool {
        matches!(
            Self::commit(&opening.label, &opening.value, &opening.blinding),
            Ok(recomputed) if recomputed == *self
        )
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

/// Everything needed to check a single blinded commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub label: String,
    pub value: serde_json::Value,
    pub blinding: Blinding,
}

impl Opening {
    pub fn new<T: Serialize + ?Sized>(
        label: impl Into<String>,
        value: &T,
        blinding: Blinding,
    ) -> Result<Self, CanonicalizationError> {
        Ok(Self {
            label: label.into(),
            value: serde_json::to_value(value)?,
            blinding,
        })
    }

    /// Commitment this opening corresponds to.
    pub fn commitment(&self) -> Result<Commitment, CanonicalizationError> {
        Commitment::commit(&self.label, &self.value, &self.blinding)
    }
}
