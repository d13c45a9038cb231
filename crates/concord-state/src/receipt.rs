//! # Receipt Status
//!
//! `Pending → Verified | Failed`. A receipt's content never changes after
//! issuance; only this status moves, and only once.

use serde::{Deserialize, Serialize};

use crate::lifecycle::Lifecycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Verified,
    Failed,
}

impl Lifecycle for ReceiptStatus {
    fn initial() -> Self {
        Self::Pending
    }

    fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }

    fn allows(self, to: Self) -> bool {
        matches!((self, to), (Self::Pending, Self::Verified) | (Self::Pending, Self::Failed))
    }

    fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
