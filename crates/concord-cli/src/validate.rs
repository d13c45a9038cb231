//! # validate-config Subcommand
//!
//! Loads the federation config named by `--config` or `CONCORD_CONFIG`,
//! builds a registry from it exactly as a node would at startup, and
//! lists the members.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use concord_core::SystemClock;
use concord_federation::{FederationConfig, Jurisdiction, JurisdictionRegistry};

#[derive(Args, Debug)]
pub struct ValidateConfigArgs {
    /// Print the members as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Returns exit code 0 on success; any failure is an `Err` (exit 1).
pub fn run_validate_config(args: &ValidateConfigArgs, config: Option<&Path>) -> Result<u8> {
    let path = crate::resolve_config_path(config)
        .with_context(|| format!("no federation config given: pass --config or set {}", crate::CONFIG_ENV))?;
    let members = load_members(&path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&members)?);
    } else {
        println!("{}: {} jurisdiction(s)", path.display(), members.len());
        for j in &members {
            println!("{}", describe(j));
        }
    }
    Ok(0)
}

fn load_members(path: &Path) -> Result<Vec<Jurisdiction>> {
    let config = FederationConfig::load(path)?;
    let registry = JurisdictionRegistry::from_config(&config, Arc::new(SystemClock))
        .with_context(|| format!("cannot build registry from {}", path.display()))?;
    tracing::info!(path = %path.display(), members = registry.len(), "federation config valid");
    Ok(registry.list_all())
}

fn describe(j: &Jurisdiction) -> String {
    format!(
        "  {:<6} {:<24} {:<12} {:<9} net={} verify={} key={}",
        j.id.as_str(),
        j.name,
        j.governance.as_str(),
        j.privacy.as_str(),
        j.network_endpoints.len(),
        j.verification_endpoints.len(),
        if j.verifying_key.is_some() { "yes" } else { "no" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_config_exits_zero() {
        let file = write("jurisdictions:\n  - {code: KE, name: Kenya, governance: unitary}\n");
        let code = run_validate_config(&ValidateConfigArgs { json: false }, Some(file.path())).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn members_listed_in_file_order() {
        let file = write(
            "jurisdictions:\n  - {code: ng, name: Nigeria, governance: federal}\n  - {code: KE, name: Kenya, governance: unitary}\n",
        );
        let members = load_members(file.path()).unwrap();
        let codes: Vec<_> = members.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(codes, ["NG", "KE"]);
        assert!(describe(&members[0]).contains("federal"));
    }

    #[test]
    fn invalid_config_is_error() {
        let file = write("jurisdictions:\n  - {code: '', name: Nowhere, governance: unitary}\n");
        let err = run_validate_config(&ValidateConfigArgs { json: false }, Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("jurisdictions[0].code"));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.yaml");
        assert!(run_validate_config(&ValidateConfigArgs { json: true }, Some(&path)).is_err());
    }
}
