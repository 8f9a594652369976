//! Local image model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

use super::ids::RecordId;

/// Upload lifecycle of a captured photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

impl ImageStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for ImageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "uploading" => Ok(Self::Uploading),
            "uploaded" => Ok(Self::Uploaded),
            "failed" => Ok(Self::Failed),
            other => Err(Error::InvalidInput(format!(
                "Unknown image status: {other}"
            ))),
        }
    }
}

/// A captured photo tracked from local file to server URL.
///
/// The local path is the image's identity from capture until upload; the
/// server URL joins it once the upload completes. A row is local-only,
/// dual, or server-only after local cleanup, and always belongs to an
/// inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalImage {
    /// Managed-directory path, empty only after local cleanup.
    pub local_path: String,
    /// Durable server URL once uploaded.
    pub server_url: Option<String>,
    /// Upload lifecycle state.
    pub status: ImageStatus,
    /// Owning inspection.
    pub inspection_id: RecordId,
    /// Owning entry when the photo is attached to a field.
    pub entry_id: Option<RecordId>,
    /// Capture timestamp (Unix ms).
    pub created_at: i64,
}

impl LocalImage {
    /// Create a pending image record for a freshly captured photo.
    #[must_use]
    pub fn new(
        local_path: impl Into<String>,
        inspection_id: RecordId,
        entry_id: Option<RecordId>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            server_url: None,
            status: ImageStatus::Pending,
            inspection_id,
            entry_id,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// True once the server holds a durable copy.
    #[must_use]
    pub const fn is_uploaded(&self) -> bool {
        matches!(self.status, ImageStatus::Uploaded)
    }
}
