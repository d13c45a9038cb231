//! # Jurisdiction Profiles
//!
//! Static profile attributes read from federation configuration. The
//! runtime membership record (endpoints, activity flag, registration
//! time) lives in the federation registry; these enums are just the
//! vocabulary it is described with.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How a member jurisdiction is governed internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceStyle {
    Federal,
    Unitary,
    Confederate,
}

impl GovernanceStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federal => "federal",
            Self::Unitary => "unitary",
            Self::Confederate => "confederate",
        }
    }
}

impl FromStr for GovernanceStyle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "federal" => Ok(Self::Federal),
            "unitary" => Ok(Self::Unitary),
            "confederate" => Ok(Self::Confederate),
            _ => Err(ValidationError::UnknownVariant {
                kind: "governance style",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GovernanceStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-sharing posture a jurisdiction declares toward the federation.
///
/// `Strict` members expect every receipt field to stay behind a blinded
/// commitment unless explicitly disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyProfile {
    Strict,
    #[default]
    Standard,
    Open,
}

impl PrivacyProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Standard => "standard",
            Self::Open => "open",
        }
    }
}

impl FromStr for PrivacyProfile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "standard" => Ok(Self::Standard),
            "open" => Ok(Self::Open),
            _ => Err(ValidationError::UnknownVariant {
                kind: "privacy profile",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PrivacyProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn governance_parses_case_insensitively() {
        assert_eq!("Federal".parse::<GovernanceStyle>().unwrap(), GovernanceStyle::Federal);
        assert_eq!(" confederate ".parse::<GovernanceStyle>().unwrap(), GovernanceStyle::Confederate);
        assert!("monarchy".parse::<GovernanceStyle>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&GovernanceStyle::Unitary).unwrap(), "\"unitary\"");
        let p: PrivacyProfile = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(p, PrivacyProfile::Strict);
    }

    #[test]
    fn display_matches_wire_form() {
        for p in [PrivacyProfile::Strict, PrivacyProfile::Standard, PrivacyProfile::Open] {
            assert_eq!(p.to_string().parse::<PrivacyProfile>().unwrap(), p);
        }
    }
}
