//! Resolved conflict model

use serde::{Deserialize, Serialize};

/// Record of a conflict the resolver settled during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConflict {
    /// Conflict row identifier.
    pub id: i64,
    /// Entity involved: `inspection` or `entry`.
    pub entity_kind: String,
    /// Identifier of the involved entity.
    pub entity_id: String,
    /// Local side's timestamp when the conflict occurred.
    pub local_updated_at: i64,
    /// Server side's timestamp when the conflict occurred.
    pub server_updated_at: i64,
    /// Which side won: `server`, `local`, or `merged`.
    pub winner: String,
    /// Resolution strategy name.
    pub strategy: String,
    /// Resolution timestamp (Unix ms).
    pub resolved_at: i64,
}
