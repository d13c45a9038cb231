//! # concord-core — Foundational Types for the Federation Core
//!
//! The leaf of the Concord crate graph. Every other crate depends on
//! `concord-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `JurisdictionId`, `ProposalId`, `ReceiptId`,
//!    `ActionId` are distinct types with validated constructors, so a
//!    proposal id can never be passed where a receipt id is expected.
//!
//! 2. **`CanonicalBytes` is the only hashing input.** Statements, ledger
//!    leaves, commitments and nullifiers are all digested from JCS bytes.
//!    Two nodes encoding the same claim produce the same bytes regardless
//!    of field order.
//!
//! 3. **UTC-only timestamps** with second precision, so timestamps inside
//!    hashed structures canonicalize identically on every node.
//!
//! 4. **Injectable time.** The [`Clock`] trait lets services read "now"
//!    without touching global state; tests drive a [`ManualClock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `concord-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod jurisdiction;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ConcordError, CryptoError, ValidationError};
pub use identity::{ActionId, JurisdictionId, ProposalId, ReceiptId};
pub use jurisdiction::{GovernanceStyle, PrivacyProfile};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
