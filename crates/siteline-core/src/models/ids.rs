//! Record identifiers shared by inspections and entries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

fn uuid_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .expect("Invalid regex")
    })
}

/// Identifier for a synced record.
///
/// Records created on the device carry a UUID v7 until the server assigns its
/// own identifier. [`RecordId::is_local`] recognizes the UUID shape, which is
/// what routes an operation to create-vs-update during sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a new local identifier using UUID v7 (time-sortable).
    #[must_use]
    pub fn local() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// True while the identifier still has the locally generated UUID shape,
    /// meaning the server has not assigned its own id yet.
    #[must_use]
    pub fn is_local(&self) -> bool {
        uuid_shape().is_match(&self.0)
    }

    /// Borrow the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
