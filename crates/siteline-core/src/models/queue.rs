//! Sync queue models

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::error::Error;

use super::ids::RecordId;

/// Kind of a queued outbound operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateEntry,
    UpdateEntry,
    DeleteEntry,
    UploadImage,
    CompleteInspection,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateEntry => "create_entry",
            Self::UpdateEntry => "update_entry",
            Self::DeleteEntry => "delete_entry",
            Self::UploadImage => "upload_image",
            Self::CompleteInspection => "complete_inspection",
        }
    }

    /// Priority band the kind drains in. Lower bands drain first, so entry
    /// writes land before the uploads that reference them and completion
    /// goes out last.
    #[must_use]
    pub const fn default_priority(self) -> i64 {
        match self {
            Self::CreateEntry | Self::UpdateEntry | Self::DeleteEntry => 10,
            Self::UploadImage => 20,
            Self::CompleteInspection => 30,
        }
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_entry" => Ok(Self::CreateEntry),
            "update_entry" => Ok(Self::UpdateEntry),
            "delete_entry" => Ok(Self::DeleteEntry),
            "upload_image" => Ok(Self::UploadImage),
            "complete_inspection" => Ok(Self::CompleteInspection),
            other => Err(Error::InvalidInput(format!(
                "Unknown operation kind: {other}"
            ))),
        }
    }
}

/// A durable queued operation awaiting sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Queue row identifier.
    pub id: i64,
    /// Operation kind.
    pub kind: OperationKind,
    /// Record the operation targets.
    pub target_id: RecordId,
    /// Serialized operation payload.
    pub payload: Value,
    /// Priority band; lower drains first, FIFO within a band.
    pub priority: i64,
    /// Attempts so far.
    pub retry_count: i64,
    /// Message from the most recent failed attempt.
    pub last_error: Option<String>,
    /// Enqueue timestamp (Unix ms).
    pub created_at: i64,
}

impl QueuedOperation {
    /// True while the operation may be attempted again.
    #[must_use]
    pub const fn has_retries_left(&self, max_retries: i64) -> bool {
        self.retry_count < max_retries
    }
}

/// An operation about to be appended to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOperation {
    pub kind: OperationKind,
    pub target_id: RecordId,
    pub payload: Value,
    pub priority: i64,
}

impl NewOperation {
    /// Build an operation in its kind's default priority band.
    #[must_use]
    pub fn new(kind: OperationKind, target_id: RecordId, payload: Value) -> Self {
        Self {
            kind,
            target_id,
            payload,
            priority: kind.default_priority(),
        }
    }
}
