//! # Runtime-Checked Lifecycles
//!
//! A status enum implements [`Lifecycle`] to declare its initial state
//! and allowed edges; [`Tracked`] holds the current status plus the log
//! of transitions that led there.

use concord_core::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait Lifecycle: Copy + Eq + std::fmt::Debug {
    fn initial() -> Self;
    fn name(self) -> &'static str;
    fn allows(self, to: Self) -> bool;
    fn is_terminal(self) -> bool;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
    pub at: Timestamp,
    pub reason: String,
}

/// Current status plus its transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracked<S> {
    status: S,
    log: Vec<Transition<S>>,
}

impl<S: Lifecycle> Tracked<S> {
    pub fn new() -> Self {
        Self { status: S::initial(), log: Vec::new() }
    }

    pub fn status(&self) -> S {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn log(&self) -> &[Transition<S>] {
        &self.log
    }

    pub fn try_transition(
        &mut self,
        to: S,
        at: Timestamp,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.status.allows(to) {
            return Err(TransitionError::InvalidTransition { from: self.status.name(), to: to.name() });
        }
        self.log.push(Transition { from: self.status, to, at, reason: reason.into() });
        self.status = to;
        Ok(())
    }
}

impl<S: Lifecycle> Default for Tracked<S> {
    fn default() -> Self {
        Self::new()
    }
}
