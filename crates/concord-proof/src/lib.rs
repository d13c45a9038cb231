//! # concord-proof — ProofGate
//!
//! Every vote and every receipt is admitted only after a [`ProofGate`]
//! accepts the proof artifact submitted with it.
//!
//! ## Contract
//!
//! - The input is a [`Statement`], canonicalized to JCS bytes, plus an
//!   opaque [`ProofArtifact`].
//! - The output is a [`Verification`]. Rejection is an expected outcome
//!   carried in the value (`Invalid(reason)`), never an `Err`.
//! - Identical inputs give identical outputs. Gates hold no mutable
//!   shared state.
//! - Verification may suspend (a remote verifier); callers may drop the
//!   future at any point without side effects.
//!
//! ## Strategies
//!
//! | Gate | Artifact |
//! |---|---|
//! | [`DigestBindingGate`] | SHA-256 over the domain-tagged statement (transparent, no ZK) |
//! | [`SignatureGate`] | Ed25519 signature by the subject jurisdiction's registered key |
//! | [`RemoteGate`] | Whatever the backing verifier accepts; bounded retry and timeout |
//!
//! A real proof system plugs in by implementing [`ProofGate`] (or
//! [`VerifierBackend`] behind a [`RemoteGate`]).

pub mod digest_gate;
pub mod gate;
pub mod remote;
pub mod signature_gate;
pub mod statement;

pub use digest_gate::DigestBindingGate;
pub use gate::{FixedGate, ProofGate, Verification, VerificationFailure};
pub use remote::{BackendError, RemoteGate, RetryPolicy, VerifierBackend};
pub use signature_gate::{sign_statement, KeyResolver, SignatureGate};
pub use statement::{ProofArtifact, Statement};
