//! # concord-cli — Operator Tooling
//!
//! Provides the `concord` command-line interface.
//!
//! ## Subcommands
//!
//! - `concord validate-config` — load and validate a federation config,
//!   then list its members.
//! - `concord verify-export` — recompute the hash chain of an exported
//!   ledger snapshot, offline.
//!
//! ```bash
//! concord validate-config --config federation.yaml
//! CONCORD_CONFIG=federation.yaml concord validate-config
//! concord verify-export ledger-export.json --through 41 --json
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | valid |
//! | 1 | I/O, parse or validation error |
//! | 2 | ledger integrity fault |

pub mod export;
pub mod validate;

use std::path::{Path, PathBuf};

/// Environment variable naming the federation config file.
pub const CONFIG_ENV: &str = "CONCORD_CONFIG";

/// `--config` wins over [`CONFIG_ENV`].
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
}
