//! # Error Hierarchy
//!
//! Foundational error types shared by every Concord crate, built with
//! `thiserror`. Higher crates wrap these in their own enums and add the
//! operation-specific context (proposal id, ledger index, etc.).

use thiserror::Error;

/// Top-level error for foundational operations.
#[derive(Error, Debug)]
pub enum ConcordError {
    /// Canonicalization failed while preparing bytes for a digest.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A domain primitive was rejected at construction.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Non-integer numbers cannot be canonicalized; amounts use integer
    /// minor units.
    #[error("float values are not permitted in canonical representations; use integer minor units: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A digest was malformed or could not be computed.
    #[error("digest error: {0}")]
    DigestError(String),

    /// Canonicalization of the hashed value failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Validation errors for identifier and value newtypes.
///
/// Each variant carries the rejected input so that operators can see
/// exactly what was supplied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Jurisdiction code is empty or contains whitespace.
    #[error("invalid jurisdiction code: {0:?} (expected a non-empty code without whitespace)")]
    InvalidJurisdictionId(String),

    /// Action identifier is empty.
    #[error("invalid action id: must be non-empty")]
    InvalidActionId,

    /// Identifier is not a UUID.
    #[error("invalid {kind} id: {value:?} is not a UUID")]
    InvalidUuid {
        /// Which identifier namespace was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: {value:?} ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An enum-like string had no matching variant.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// The enum being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_input() {
        let err = ValidationError::InvalidJurisdictionId("  ".into());
        assert!(err.to_string().contains("\"  \""));
    }

    #[test]
    fn canonicalization_wraps_into_top_level() {
        let err: ConcordError = CanonicalizationError::FloatRejected(1.5).into();
        assert!(err.to_string().starts_with("canonicalization error"));
    }

    #[test]
    fn uuid_error_names_namespace() {
        let err = ValidationError::InvalidUuid { kind: "proposal", value: "nope".into() };
        assert_eq!(err.to_string(), "invalid proposal id: \"nope\" is not a UUID");
    }
}
