//! # concord-federation — Federation Services
//!
//! Wires the proof gate and the commitment ledger into the two
//! collaborator-facing services:
//!
//! - [`ConsensusEngine`]: opens proposals across registered
//!   jurisdictions, admits proof-gated votes, and finalizes verdicts.
//! - [`ReceiptService`]: issues hash-linked, nullifier-protected receipts
//!   for discrete actions and re-verifies them on demand.
//!
//! [`JurisdictionRegistry`] holds runtime membership, initialized once
//! from a [`FederationConfig`]. [`Federation`] owns one of each.
//!
//! ## Concurrency
//!
//! Proof verification is the only suspension point and runs with no lock
//! held. Every ledger append happens after verification returns, inside
//! a synchronous critical section, so dropping an in-flight `cast_vote`
//! or `issue` future never leaves a partial entry.
//!
//! Lock order is proposal → ledger. The registry and the service maps are
//! never locked while a ledger append is in progress.

pub mod config;
pub mod consensus;
pub mod error;
pub mod federation;
pub mod journal;
pub mod receipts;
pub mod registry;

pub use config::{AuditConfig, FederationConfig, JurisdictionConfig, ReceiptConfig, VerifierConfig};
pub use consensus::{ConsensusEngine, Proposal, Vote, VoteOutcome};
pub use error::{ConfigError, ConsensusError, FederationError, ReceiptError, RegistryError};
pub use federation::Federation;
pub use journal::{RejectedAttempt, DEFAULT_JOURNAL_CAPACITY};
pub use receipts::{
    ActionKind, BatchOutcome, CheckFailure, PreparedReceipt, Receipt, ReceiptCheck, ReceiptField,
    ReceiptService, ReceiptVerification, SubjectAction,
};
pub use registry::{Jurisdiction, JurisdictionRegistry, JurisdictionSpec, JurisdictionUpdate};
