//! # concord-state — Lifecycle State Machines
//!
//! - **Proposal** (`proposal.rs`): `Voting → Passed | Failed`, both
//!   terminal. The pure [`ProposalTally`] decides the verdict from vote
//!   counts and a [`Threshold`].
//! - **Receipt** (`receipt.rs`): `Pending → Verified | Failed`.
//!
//! Both run through [`Tracked`], which rejects any transition the
//! lifecycle does not allow and appends every accepted one to an
//! immutable log. Nothing ever leaves a terminal state.

pub mod lifecycle;
pub mod proposal;
pub mod receipt;

pub use lifecycle::{Lifecycle, Tracked, Transition, TransitionError};
pub use proposal::{ProposalStatus, ProposalTally, TallyError, Threshold, ThresholdError};
pub use receipt::ReceiptStatus;
