//! # concord-crypto — Cryptographic Primitives
//!
//! Building blocks shared by the proof gate, the ledger and the receipt
//! service:
//!
//! - **Commitments**: blinded, one-way bindings to receipt fields that can
//!   later be opened one field at a time.
//! - **Nullifiers**: domain-separated digests marking a vote or action as
//!   spent.
//! - **Merkle Mountain Range (MMR)**: the append-only accumulator behind
//!   every ledger merkle root, with inclusion proofs.
//! - **Ed25519** signing and verification over canonical bytes.
//!
//! ## Crate Policy
//!
//! - Depends only on `concord-core` internally.
//! - Tests use real SHA-256 and real Ed25519; nothing is mocked.
//! - No `unsafe`.

pub mod commitment;
pub mod ed25519;
pub mod hex;
pub mod mmr;
pub mod nullifier;

pub use commitment::{Blinding, Commitment, Opening};
pub use ed25519::{verify_with_public_key, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use mmr::{verify_inclusion_proof, InclusionProof, MerkleMountainRange, MmrError, Peak};
pub use nullifier::Nullifier;
