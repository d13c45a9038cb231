//! # Remote Verifier Gate
//!
//! Forwards verification to an external verifier through a
//! [`VerifierBackend`]. Transport is the backend's concern; this gate owns
//! the retry budget:
//!
//! - each attempt is bounded by `timeout`;
//! - at most `max_attempts` attempts, `backoff` apart;
//! - a verdict from the backend (valid or not) is final and never retried;
//! - only transport errors and timeouts are retried;
//! - on exhaustion the result is `Invalid(VerifierUnavailable)`, which
//!   callers treat as a failed verification.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::gate::{ProofGate, Verification, VerificationFailure};
use crate::statement::{ProofArtifact, Statement};

/// A transient failure reaching the verifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("verifier backend error: {0}")]
pub struct BackendError(pub String);

/// Connection to an external verifier.
pub trait VerifierBackend: Send + Sync {
    /// `Ok` carries the verifier's verdict; `Err` is a transport failure.
    fn check(
        &self,
        statement: &Statement,
        artifact: &ProofArtifact,
    ) -> impl Future<Output = Result<Verification, BackendError>> + Send;
}

/// Attempt budget for a [`RemoteGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below one is raised to one.
    pub fn new(timeout: Duration, max_attempts: u32, backoff: Duration) -> Self {
        Self { timeout, max_attempts: max_attempts.max(1), backoff }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), 3, Duration::from_millis(100))
    }
}

#[derive(Debug, Clone)]
pub struct RemoteGate<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: VerifierBackend> RemoteGate<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<B: VerifierBackend> ProofGate for RemoteGate<B> {
    async fn verify(&self, statement: &Statement, artifact: &ProofArtifact) -> Verification {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.policy.timeout, self.backend.check(statement, artifact)).await {
                Ok(Ok(verdict)) => return verdict,
                Ok(Err(e)) => tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    statement = statement.kind(),
                    error = %e,
                    "proof verifier request failed"
                ),
                Err(_) => tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    statement = statement.kind(),
                    timeout_ms = self.policy.timeout.as_millis() as u64,
                    "proof verifier timed out"
                ),
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }
        tracing::warn!(
            attempts,
            subject = %statement.subject(),
            "proof verifier unavailable; treating as failed verification"
        );
        VerificationFailure::VerifierUnavailable { attempts }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{JurisdictionId, ProposalId};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Replays `script` one entry per call; `None` hangs forever.
    struct Scripted {
        calls: Arc<AtomicU32>,
        script: Vec<Option<Result<Verification, BackendError>>>,
    }

    impl VerifierBackend for Scripted {
        async fn check(&self, _s: &Statement, _a: &ProofArtifact) -> Result<Verification, BackendError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.script.get(n).cloned().flatten() {
                Some(r) => r,
                None => std::future::pending().await,
            }
        }
    }

    fn gate(script: Vec<Option<Result<Verification, BackendError>>>) -> (RemoteGate<Scripted>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(Duration::from_millis(20), 3, Duration::from_millis(1));
        (RemoteGate::new(Scripted { calls: calls.clone(), script }, policy), calls)
    }

    fn statement() -> Statement {
        Statement::Vote {
            proposal_id: ProposalId::new(),
            jurisdiction: JurisdictionId::new("AT").unwrap(),
            support: true,
        }
    }

    #[tokio::test]
    async fn first_verdict_is_returned() {
        let (g, calls) = gate(vec![Some(Ok(Verification::Valid))]);
        assert!(g.verify(&statement(), &ProofArtifact::default()).await.is_valid());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_errors_are_retried() {
        let (g, calls) = gate(vec![
            Some(Err(BackendError("refused".into()))),
            Some(Ok(Verification::Valid)),
        ]);
        assert!(g.verify(&statement(), &ProofArtifact::default()).await.is_valid());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejection_is_final() {
        let (g, calls) = gate(vec![
            Some(Ok(VerificationFailure::StatementMismatch.into())),
            Some(Ok(Verification::Valid)),
        ]);
        let v = g.verify(&statement(), &ProofArtifact::default()).await;
        assert_eq!(v.outcome(), "statement_mismatch");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeouts_exhaust_to_unavailable() {
        let (g, calls) = gate(vec![None, None, None, Some(Ok(Verification::Valid))]);
        let v = g.verify(&statement(), &ProofArtifact::default()).await;
        assert_eq!(v, Verification::Invalid(VerificationFailure::VerifierUnavailable { attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(Duration::ZERO, 0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
