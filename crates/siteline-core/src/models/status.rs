//! Sync status shared by inspections and entries.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Where a record stands relative to the server copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local copy matches the last known server copy.
    Synced,
    /// Local changes have not reached the server yet.
    Pending,
    /// A conflict was detected and resolved; awaiting the next push.
    Conflict,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Conflict => "conflict",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "synced" => Ok(Self::Synced),
            "pending" => Ok(Self::Pending),
            "conflict" => Ok(Self::Conflict),
            other => Err(Error::InvalidInput(format!(
                "Unknown sync status: {other}"
            ))),
        }
    }
}
