//! # Federation Wiring
//!
//! One ledger, one registry, one gate, one consensus engine and one
//! receipt service, built from a [`FederationConfig`]. Nothing here is
//! global: a process may run several federations side by side.

use std::sync::Arc;

use concord_core::{Clock, SystemClock};
use concord_ledger::{CommitmentLedger, LedgerExport};
use concord_proof::{ProofGate, RemoteGate, SignatureGate, VerifierBackend};

use crate::config::FederationConfig;
use crate::consensus::ConsensusEngine;
use crate::error::FederationError;
use crate::receipts::ReceiptService;
use crate::registry::JurisdictionRegistry;

pub struct Federation<G> {
    config: FederationConfig,
    ledger: Arc<CommitmentLedger>,
    registry: Arc<JurisdictionRegistry>,
    consensus: ConsensusEngine<Arc<G>>,
    receipts: ReceiptService<Arc<G>>,
}

impl<G> std::fmt::Debug for Federation<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Federation")
            .field("registry", &self.registry)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl<G: ProofGate> Federation<G> {
    /// Build with a gate derived from the registry (e.g. a
    /// [`SignatureGate`] resolving members' keys).
    pub fn build(
        config: FederationConfig,
        clock: Arc<dyn Clock>,
        gate: impl FnOnce(&Arc<JurisdictionRegistry>) -> G,
    ) -> Result<Self, FederationError> {
        config.validate()?;
        let registry = Arc::new(JurisdictionRegistry::from_config(&config, clock.clone())?);
        let ledger = Arc::new(CommitmentLedger::with_clock(clock.clone()));
        let gate = Arc::new(gate(&registry));

        let journal_capacity = config.audit.max_rejected_attempts;
        let consensus = ConsensusEngine::with_clock(gate.clone(), ledger.clone(), registry.clone(), clock.clone())
            .with_journal_capacity(journal_capacity);
        let receipts = ReceiptService::with_config(gate, ledger.clone(), config.receipts, clock)
            .with_journal_capacity(journal_capacity);

        tracing::info!(
            jurisdictions = registry.len(),
            clock_skew_tolerance_secs = config.receipts.clock_skew_tolerance_secs,
            journal_capacity,
            "federation initialized"
        );
        Ok(Self { config, ledger, registry, consensus, receipts })
    }

    pub fn with_gate(config: FederationConfig, gate: G) -> Result<Self, FederationError> {
        Self::build(config, Arc::new(SystemClock), |_| gate)
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<CommitmentLedger> {
        &self.ledger
    }

    pub fn registry(&self) -> &Arc<JurisdictionRegistry> {
        &self.registry
    }

    pub fn consensus(&self) -> &ConsensusEngine<Arc<G>> {
        &self.consensus
    }

    pub fn receipts(&self) -> &ReceiptService<Arc<G>> {
        &self.receipts
    }

    pub fn export(&self) -> LedgerExport {
        self.ledger.export()
    }
}

impl Federation<SignatureGate<Arc<JurisdictionRegistry>>> {
    /// Proofs are Ed25519 signatures by each member's configured key.
    pub fn signature_gated(config: FederationConfig, clock: Arc<dyn Clock>) -> Result<Self, FederationError> {
        Self::build(config, clock, |registry| SignatureGate::new(registry.clone()))
    }
}

impl<B: VerifierBackend> Federation<RemoteGate<B>> {
    /// Proofs are checked by an external verifier, bounded by the
    /// `verifier` section of `config`.
    pub fn remote_gated(config: FederationConfig, clock: Arc<dyn Clock>, backend: B) -> Result<Self, FederationError> {
        let policy = config.verifier.retry_policy();
        tracing::debug!(
            timeout_ms = config.verifier.timeout_ms,
            max_attempts = policy.max_attempts,
            backoff_ms = config.verifier.backoff_ms,
            "remote proof verifier configured"
        );
        Self::build(config, clock, move |_| RemoteGate::new(backend, policy))
    }
}
