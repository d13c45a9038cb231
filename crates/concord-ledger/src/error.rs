use concord_core::CanonicalizationError;
use concord_crypto::{MmrError, Nullifier};
use thiserror::Error;

/// Why an append was refused. A refused append changes nothing.
#[derive(Error, Debug)]
pub enum AppendError {
    /// The nullifier was already consumed by entry `first_index`.
    #[error("nullifier {nullifier} already consumed by ledger entry {first_index}")]
    NullifierReused { nullifier: Nullifier, first_index: u64 },

    #[error("entry could not be canonicalized: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Errors from ledger queries and verification.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger index {index} out of range (ledger has {len} entries)")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("entry could not be canonicalized: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("inclusion proof: {0}")]
    Mmr(#[from] MmrError),
}
