//! # Federation Configuration
//!
//! Static membership and tuning, read once when the registry is built:
//!
//! ```yaml
//! jurisdictions:
//!   - code: KE
//!     name: Kenya
//!     governance: unitary
//!     privacy: standard
//!     network_endpoints: ["https://ke.node.example:7000"]
//!     verification_endpoints: ["https://ke.verify.example"]
//!     verifying_key: "9d61b19d..."   # optional, hex Ed25519 public key
//! verifier:
//!   timeout_ms: 2000
//!   max_attempts: 3
//!   backoff_ms: 100
//! receipts:
//!   clock_skew_tolerance_secs: 300
//! audit:
//!   max_rejected_attempts: 10000
//! ```
//!
//! YAML is a superset of JSON, so both formats go through `serde_yaml`.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use concord_core::{GovernanceStyle, JurisdictionId, PrivacyProfile};
use concord_crypto::Ed25519PublicKey;
use concord_proof::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::journal::DEFAULT_JOURNAL_CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FederationConfig {
    #[serde(default)]
    pub jurisdictions: Vec<JurisdictionConfig>,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub receipts: ReceiptConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// One member as written in the config file. Fields stay raw strings so
/// validation can name the exact entry that is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JurisdictionConfig {
    pub code: String,
    pub name: String,
    pub governance: GovernanceStyle,
    #[serde(default)]
    pub privacy: PrivacyProfile,
    #[serde(default)]
    pub network_endpoints: Vec<String>,
    #[serde(default)]
    pub verification_endpoints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000, max_attempts: 3, backoff_ms: 100 }
    }
}

impl VerifierConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.timeout_ms),
            self.max_attempts,
            Duration::from_millis(self.backoff_ms),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiptConfig {
    /// How far past the local clock an action timestamp may be.
    pub clock_skew_tolerance_secs: u64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self { clock_skew_tolerance_secs: 300 }
    }
}

/// Bounds on the rejected-attempt journals kept by each service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Oldest 10% are trimmed once a journal grows past this.
    pub max_rejected_attempts: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { max_rejected_attempts: DEFAULT_JOURNAL_CAPACITY }
    }
}

impl FederationConfig {
    /// Read, parse and validate the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_yaml::from_str(&raw)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            jurisdictions = config.jurisdictions.len(),
            "federation config loaded"
        );
        Ok(config)
    }

    /// Parse and validate an in-memory YAML or JSON document.
    pub fn from_str_validated(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| ConfigError::Parse { path: "<inline>".into(), message: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (i, j) in self.jurisdictions.iter().enumerate() {
            let id = j.jurisdiction_id().map_err(|e| ConfigError::invalid(format!("jurisdictions[{i}].code"), e))?;
            if !seen.insert(id.clone()) {
                return Err(ConfigError::invalid(
                    format!("jurisdictions[{i}].code"),
                    format!("duplicate jurisdiction {id}"),
                ));
            }
            if j.name.trim().is_empty() {
                return Err(ConfigError::invalid(format!("jurisdictions[{i}].name"), "must not be empty"));
            }
            for (k, endpoint) in j.network_endpoints.iter().enumerate() {
                check_endpoint(endpoint, || format!("jurisdictions[{i}].network_endpoints[{k}]"))?;
            }
            for (k, endpoint) in j.verification_endpoints.iter().enumerate() {
                check_endpoint(endpoint, || format!("jurisdictions[{i}].verification_endpoints[{k}]"))?;
            }
            j.verifying_key().map_err(|e| ConfigError::invalid(format!("jurisdictions[{i}].verifying_key"), e))?;
        }

        if self.verifier.max_attempts == 0 {
            return Err(ConfigError::invalid("verifier.max_attempts", "must be at least 1"));
        }
        if self.verifier.timeout_ms == 0 {
            return Err(ConfigError::invalid("verifier.timeout_ms", "must be greater than 0"));
        }
        if self.audit.max_rejected_attempts == 0 {
            return Err(ConfigError::invalid("audit.max_rejected_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

impl JurisdictionConfig {
    pub fn jurisdiction_id(&self) -> Result<JurisdictionId, String> {
        JurisdictionId::new(self.code.as_str()).map_err(|e| e.to_string())
    }

    pub fn verifying_key(&self) -> Result<Option<Ed25519PublicKey>, String> {
        self.verifying_key
            .as_deref()
            .map(|hex| Ed25519PublicKey::from_hex(hex).map_err(|e| e.to_string()))
            .transpose()
    }
}

fn check_endpoint(endpoint: &str, field: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if endpoint.trim().is_empty() || endpoint.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(field(), format!("not a usable endpoint: {endpoint:?}")));
    }
    Ok(())
}
