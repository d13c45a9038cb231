//! # Jurisdiction Registry
//!
//! Runtime membership of the federation. Identity is fixed at
//! registration; endpoints, profile and key change only through
//! [`JurisdictionRegistry::update`]. Members are deactivated, never
//! removed, so every recorded vote stays attributable.
//!
//! Reads vastly outnumber writes, so the table sits behind one
//! `parking_lot::RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use concord_core::{Clock, GovernanceStyle, JurisdictionId, PrivacyProfile, SystemClock, Timestamp};
use concord_crypto::Ed25519PublicKey;
use concord_proof::KeyResolver;
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::{FederationConfig, JurisdictionConfig};
use crate::error::{ConfigError, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jurisdiction {
    pub id: JurisdictionId,
    pub name: String,
    pub governance: GovernanceStyle,
    pub privacy: PrivacyProfile,
    pub network_endpoints: Vec<String>,
    pub verification_endpoints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_key: Option<Ed25519PublicKey>,
    pub registered_at: Timestamp,
    pub active: bool,
}

/// Registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurisdictionSpec {
    pub id: JurisdictionId,
    pub name: String,
    pub governance: GovernanceStyle,
    pub privacy: PrivacyProfile,
    pub network_endpoints: Vec<String>,
    pub verification_endpoints: Vec<String>,
    pub verifying_key: Option<Ed25519PublicKey>,
}

impl JurisdictionSpec {
    pub fn new(id: JurisdictionId, name: impl Into<String>, governance: GovernanceStyle) -> Self {
        Self {
            id,
            name: name.into(),
            governance,
            privacy: PrivacyProfile::default(),
            network_endpoints: Vec::new(),
            verification_endpoints: Vec::new(),
            verifying_key: None,
        }
    }

    pub fn with_verifying_key(mut self, key: Ed25519PublicKey) -> Self {
        self.verifying_key = Some(key);
        self
    }
}

impl TryFrom<&JurisdictionConfig> for JurisdictionSpec {
    type Error = ConfigError;

    fn try_from(c: &JurisdictionConfig) -> Result<Self, Self::Error> {
        let id = c.jurisdiction_id().map_err(|e| ConfigError::invalid("code", e))?;
        let verifying_key = c
            .verifying_key()
            .map_err(|e| ConfigError::invalid(format!("{id}.verifying_key"), e))?;
        Ok(Self {
            id,
            name: c.name.clone(),
            governance: c.governance,
            privacy: c.privacy,
            network_endpoints: c.network_endpoints.clone(),
            verification_endpoints: c.verification_endpoints.clone(),
            verifying_key,
        })
    }
}

/// Explicit reconfiguration. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JurisdictionUpdate {
    pub name: Option<String>,
    pub governance: Option<GovernanceStyle>,
    pub privacy: Option<PrivacyProfile>,
    pub network_endpoints: Option<Vec<String>>,
    pub verification_endpoints: Option<Vec<String>>,
    pub verifying_key: Option<Ed25519PublicKey>,
}

#[derive(Debug, Default)]
struct Table {
    members: Vec<Jurisdiction>,
    index: HashMap<JurisdictionId, usize>,
}

pub struct JurisdictionRegistry {
    table: RwLock<Table>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JurisdictionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JurisdictionRegistry").field("members", &self.table.read().members.len()).finish()
    }
}

impl Default for JurisdictionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JurisdictionRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { table: RwLock::new(Table::default()), clock }
    }

    /// Build from static configuration. The config is only read.
    pub fn from_config(config: &FederationConfig, clock: Arc<dyn Clock>) -> Result<Self, RegistryError> {
        config.validate()?;
        let registry = Self::with_clock(clock);
        for member in &config.jurisdictions {
            registry.register(JurisdictionSpec::try_from(member)?)?;
        }
        Ok(registry)
    }

    pub fn register(&self, spec: JurisdictionSpec) -> Result<Jurisdiction, RegistryError> {
        let mut table = self.table.write();
        if table.index.contains_key(&spec.id) {
            tracing::warn!(jurisdiction = %spec.id, "duplicate jurisdiction registration rejected");
            return Err(RegistryError::DuplicateJurisdiction(spec.id));
        }
        let jurisdiction = Jurisdiction {
            id: spec.id,
            name: spec.name,
            governance: spec.governance,
            privacy: spec.privacy,
            network_endpoints: spec.network_endpoints,
            verification_endpoints: spec.verification_endpoints,
            verifying_key: spec.verifying_key,
            registered_at: self.clock.now(),
            active: true,
        };
        let position = table.members.len();
        table.index.insert(jurisdiction.id.clone(), position);
        table.members.push(jurisdiction.clone());
        tracing::info!(
            jurisdiction = %jurisdiction.id,
            governance = jurisdiction.governance.as_str(),
            privacy = jurisdiction.privacy.as_str(),
            "jurisdiction registered"
        );
        Ok(jurisdiction)
    }

    /// Active or not; inactive members stay resolvable.
    pub fn get(&self, id: &JurisdictionId) -> Result<Jurisdiction, RegistryError> {
        let table = self.table.read();
        table
            .index
            .get(id)
            .map(|&i| table.members[i].clone())
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Active members in registration order.
    pub fn list(&self) -> Vec<Jurisdiction> {
        self.table.read().members.iter().filter(|j| j.active).cloned().collect()
    }

    /// Every member ever registered, in registration order.
    pub fn list_all(&self) -> Vec<Jurisdiction> {
        self.table.read().members.clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn update(&self, id: &JurisdictionId, update: JurisdictionUpdate) -> Result<Jurisdiction, RegistryError> {
        let updated = self.modify(id, |j| {
            if let Some(name) = update.name {
                j.name = name;
            }
            if let Some(governance) = update.governance {
                j.governance = governance;
            }
            if let Some(privacy) = update.privacy {
                j.privacy = privacy;
            }
            if let Some(endpoints) = update.network_endpoints {
                j.network_endpoints = endpoints;
            }
            if let Some(endpoints) = update.verification_endpoints {
                j.verification_endpoints = endpoints;
            }
            if let Some(key) = update.verifying_key {
                j.verifying_key = Some(key);
            }
        })?;
        tracing::info!(jurisdiction = %updated.id, "jurisdiction updated");
        Ok(updated)
    }

    /// Idempotent.
    pub fn deactivate(&self, id: &JurisdictionId) -> Result<Jurisdiction, RegistryError> {
        let member = self.modify(id, |j| j.active = false)?;
        tracing::info!(jurisdiction = %member.id, "jurisdiction deactivated");
        Ok(member)
    }

    fn modify(&self, id: &JurisdictionId, f: impl FnOnce(&mut Jurisdiction)) -> Result<Jurisdiction, RegistryError> {
        let mut table = self.table.write();
        let Some(&i) = table.index.get(id) else {
            return Err(RegistryError::NotFound(id.clone()));
        };
        let member = &mut table.members[i];
        f(member);
        Ok(member.clone())
    }
}

impl KeyResolver for JurisdictionRegistry {
    fn verifying_key(&self, jurisdiction: &JurisdictionId) -> Option<Ed25519PublicKey> {
        let table = self.table.read();
        table.index.get(jurisdiction).and_then(|&i| table.members[i].verifying_key.clone())
    }
}
