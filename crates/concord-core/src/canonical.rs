//! # Canonical Serialization
//!
//! `CanonicalBytes` is the single construction path for bytes that are
//! hashed, committed to, or signed anywhere in the federation core.
//!
//! ## Rules
//!
//! 1. **No floats.** Amounts travel as integer minor units. Float
//!    rendering differs between languages and would let two nodes hash
//!    the same claim differently.
//! 2. **Sorted keys, compact separators** (RFC 8785 via `serde_jcs`). A
//!    statement is therefore order-independent: `{"a":1,"b":2}` and
//!    `{"b":2,"a":1}` yield identical bytes.
//! 3. **Timestamps** are serialized by [`crate::Timestamp`], which is
//!    already UTC with second precision.
//!
//! The inner buffer is private, so nothing downstream can smuggle
//! non-canonical bytes into a digest.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced by JCS canonicalization after float rejection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if any number in the value tree is a non-integer.
    /// `SerializationFailed` if the value cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// The canonical byte sequence.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk the value tree and fail on the first non-integer number.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}
