//! Inspection model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

use super::ids::RecordId;
use super::status::SyncStatus;
use super::template::TemplateSnapshot;

/// Lifecycle state of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Scheduled,
    InProgress,
    Completed,
    Reviewed,
}

impl InspectionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Reviewed => "reviewed",
        }
    }
}

impl FromStr for InspectionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "reviewed" => Ok(Self::Reviewed),
            other => Err(Error::InvalidInput(format!(
                "Unknown inspection status: {other}"
            ))),
        }
    }
}

/// An inspection mirrored from the server.
///
/// The device never creates inspections; it pulls scheduled ones, captures
/// entries against them, and pushes a status change on completion. Rows are
/// soft-deleted only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    /// Server-assigned identifier.
    pub id: RecordId,
    /// Account the inspection belongs to.
    pub owner_id: String,
    /// Property or tenancy the inspection targets.
    pub target_ref: String,
    /// Frozen template captured at creation time.
    pub template: TemplateSnapshot,
    /// Lifecycle state.
    pub status: InspectionStatus,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
    /// Last update timestamp (Unix ms).
    pub updated_at: i64,
    /// Sync state relative to the server copy.
    pub sync_status: SyncStatus,
    /// Soft delete flag.
    pub is_deleted: bool,
}

impl Inspection {
    /// Create an inspection mirror row.
    #[must_use]
    pub fn new(
        id: RecordId,
        owner_id: impl Into<String>,
        target_ref: impl Into<String>,
        template: TemplateSnapshot,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id,
            owner_id: owner_id.into(),
            target_ref: target_ref.into(),
            template,
            status: InspectionStatus::Scheduled,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Synced,
            is_deleted: false,
        }
    }

    /// True when the inspection has been completed on either side.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, InspectionStatus::Completed)
    }
}
