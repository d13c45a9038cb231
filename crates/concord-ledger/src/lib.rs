//! # concord-ledger — CommitmentLedger and NullifierRegistry
//!
//! The only mutable shared state in the federation core. Votes and
//! receipts both land here as hash-linked [`LedgerEntry`] records, each
//! consuming exactly one [`Nullifier`](concord_crypto::Nullifier).
//!
//! ## Security Invariant
//!
//! The nullifier-uniqueness check and the entry append form one critical
//! section per ledger. Of any number of concurrent appends carrying the
//! same nullifier, exactly one succeeds; the rest get
//! [`AppendError::NullifierReused`] and leave the ledger untouched.
//!
//! ## Chain Rules
//!
//! - `parent_hash[0]` is the all-zero digest; `parent_hash[i]` is
//!   `entry_hash[i-1]`.
//! - `merkle_root[i]` is the MMR root over leaf digests `0..=i`.
//! - [`CommitmentLedger::verify`] recomputes everything from genesis. A
//!   mismatch at index `k` invalidates `k` and everything after it, and
//!   is reported, never repaired.
//!
//! Callers only ever receive clones of entries, never references into
//! the store.

pub mod chain;
pub mod entry;
pub mod error;
pub mod export;
pub mod ledger;
pub mod nullifier;

pub use chain::{verify_chain, ChainFault, ChainReport, FaultKind};
pub use entry::{genesis_parent, EntryType, LedgerEntry};
pub use error::{AppendError, LedgerError};
pub use export::LedgerExport;
pub use ledger::CommitmentLedger;
pub use nullifier::{NullifierRecord, NullifierRegistry};
