//! # Proposal Lifecycle and Threshold Tally
//!
//! ```text
//! Voting ──(support% ≥ threshold)──────────────▶ Passed
//!    │
//!    └──(all voted, support% < threshold)──────▶ Failed
//! ```
//!
//! Support is a ratio of *all participants* (not of votes cast). A
//! threshold is held exactly in parts per million. It is reached when the
//! exact ratio meets it, or when the ratio rounded to the nearest whole
//! percent does: two of three is 67% and reaches `0.67`, five of eight
//! is 62.5%, which rounds down to 62% and stays short of `0.63`. A 100%
//! threshold always requires every participant's support; rounding never
//! stands in for unanimity.
//!
//! Passing is checked first and may happen before everyone has voted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Voting,
    Passed,
    Failed,
}

impl Lifecycle for ProposalStatus {
    fn initial() -> Self {
        Self::Voting
    }

    fn name(self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    fn allows(self, to: Self) -> bool {
        matches!((self, to), (Self::Voting, Self::Passed) | (Self::Voting, Self::Failed))
    }

    fn is_terminal(self) -> bool {
        !matches!(self, Self::Voting)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("threshold must satisfy 0 < t <= 1, got {0}")]
    OutOfRange(f64),
    #[error("threshold percent must be 1..=100, got {0}")]
    PercentOutOfRange(u8),
    #[error("threshold must be 1..=1000000 parts per million, got {0}")]
    PpmOutOfRange(u32),
}

const PPM: u32 = 1_000_000;

/// Consensus threshold in parts per million (1..=1_000_000).
///
/// Serialized as the integer ppm so it can appear in canonical
/// (float-free) structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Threshold(u32);

impl Threshold {
    /// From a fraction `0 < t <= 1`, to the nearest ppm. Positive values
    /// below half a ppm are raised to 1 ppm.
    pub fn from_fraction(t: f64) -> Result<Self, ThresholdError> {
        if !(t > 0.0 && t <= 1.0) {
            return Err(ThresholdError::OutOfRange(t));
        }
        // 0 <= ppm <= 1e6 here.
        let ppm = (t * f64::from(PPM)).round() as u32;
        Ok(Self(ppm.clamp(1, PPM)))
    }

    pub fn from_percent(percent: u8) -> Result<Self, ThresholdError> {
        if (1..=100).contains(&percent) {
            Ok(Self(u32::from(percent) * 10_000))
        } else {
            Err(ThresholdError::PercentOutOfRange(percent))
        }
    }

    pub fn from_ppm(ppm: u32) -> Result<Self, ThresholdError> {
        if (1..=PPM).contains(&ppm) {
            Ok(Self(ppm))
        } else {
            Err(ThresholdError::PpmOutOfRange(ppm))
        }
    }

    pub fn ppm(&self) -> u32 {
        self.0
    }

    pub fn is_unanimous(&self) -> bool {
        self.0 == PPM
    }

    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / f64::from(PPM)
    }
}

impl TryFrom<u32> for Threshold {
    type Error = ThresholdError;

    fn try_from(ppm: u32) -> Result<Self, Self::Error> {
        Self::from_ppm(ppm)
    }
}

impl From<Threshold> for u32 {
    fn from(t: Threshold) -> Self {
        t.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (whole, frac) = (self.0 / 10_000, self.0 % 10_000);
        if frac == 0 {
            write!(f, "{whole}%")
        } else {
            let digits = format!("{frac:04}");
            write!(f, "{whole}.{}%", digits.trim_end_matches('0'))
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    #[error("all {participants} participants have already voted")]
    AllVoted { participants: u32 },
}

/// Vote counts for one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTally {
    pub participants: u32,
    pub support: u32,
    pub cast: u32,
}

impl ProposalTally {
    pub fn new(participants: u32) -> Self {
        Self { participants, support: 0, cast: 0 }
    }

    pub fn record(&mut self, support: bool) -> Result<(), TallyError> {
        if self.cast >= self.participants {
            return Err(TallyError::AllVoted { participants: self.participants });
        }
        self.cast += 1;
        if support {
            self.support += 1;
        }
        Ok(())
    }

    /// `support / participants` in whole percent, rounded to nearest
    /// with exact halves rounded down.
    pub fn support_percent(&self) -> u8 {
        if self.participants == 0 {
            return 0;
        }
        let n = u64::from(self.participants);
        let s = u64::from(self.support.min(self.participants));
        // s <= n, so the quotient is at most 100.
        ((200 * s + n - 1) / (2 * n)) as u8
    }

    /// Exact `support / participants >= threshold`, or the whole-percent
    /// support reaches it. Unanimity is only ever met exactly.
    pub fn reaches(&self, threshold: Threshold) -> bool {
        if self.participants == 0 {
            return false;
        }
        let support = u64::from(self.support.min(self.participants));
        if threshold.is_unanimous() {
            return support == u64::from(self.participants);
        }
        let t = u64::from(threshold.ppm());
        support * u64::from(PPM) >= t * u64::from(self.participants)
            || u64::from(self.support_percent()) * 10_000 >= t
    }

    pub fn all_voted(&self) -> bool {
        self.cast >= self.participants
    }

    /// The status these counts imply.
    pub fn verdict(&self, threshold: Threshold) -> ProposalStatus {
        if self.reaches(threshold) {
            ProposalStatus::Passed
        } else if self.all_voted() {
            ProposalStatus::Failed
        } else {
            ProposalStatus::Voting
        }
    }
}
