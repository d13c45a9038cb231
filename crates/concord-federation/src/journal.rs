//! Bounded record of rejected submissions, kept for audit.
//!
//! When the journal exceeds its capacity, the oldest 10% of entries are
//! trimmed, so a flood of junk submissions costs bounded memory.

use concord_core::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;

/// Capacity used when none is configured.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;

/// One rejected vote or receipt request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedAttempt {
    pub at: Timestamp,
    /// Proposal id or action id the attempt targeted.
    pub target: String,
    /// Jurisdiction that submitted it, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter: Option<String>,
    pub code: &'static str,
    pub reason: String,
}

#[derive(Debug)]
pub(crate) struct Journal {
    attempts: Mutex<Vec<RejectedAttempt>>,
    max_entries: usize,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAPACITY)
    }
}

impl Journal {
    /// `max_entries` below one is raised to one.
    pub(crate) fn new(max_entries: usize) -> Self {
        Self { attempts: Mutex::new(Vec::new()), max_entries: max_entries.max(1) }
    }

    pub(crate) fn record(&self, attempt: RejectedAttempt) {
        let mut attempts = self.attempts.lock();
        attempts.push(attempt);
        if attempts.len() > self.max_entries {
            let trim = (self.max_entries / 10).max(1);
            attempts.drain(..trim);
            metrics::counter!("concord_rejected_attempts_trimmed_total").increment(trim as u64);
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<RejectedAttempt> {
        self.attempts.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(n: usize) -> RejectedAttempt {
        RejectedAttempt {
            at: Timestamp::parse("2026-09-01T00:00:00Z").unwrap(),
            target: format!("t-{n}"),
            submitter: None,
            code: "proof_invalid",
            reason: "bad".into(),
        }
    }

    #[test]
    fn trims_oldest_tenth_when_full() {
        let journal = Journal::new(100);
        for n in 0..101 {
            journal.record(attempt(n));
        }
        let kept = journal.snapshot();
        assert_eq!(kept.len(), 91);
        assert_eq!(kept[0].target, "t-10");
        assert_eq!(kept.last().unwrap().target, "t-100");
    }

    #[test]
    fn never_exceeds_capacity() {
        let journal = Journal::new(10);
        for n in 0..10_000 {
            journal.record(attempt(n));
        }
        let kept = journal.snapshot();
        assert!(kept.len() <= 10);
        assert_eq!(kept.last().unwrap().target, "t-9999");
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let journal = Journal::new(0);
        journal.record(attempt(1));
        journal.record(attempt(2));
        assert_eq!(journal.snapshot(), vec![attempt(2)]);
    }
}
