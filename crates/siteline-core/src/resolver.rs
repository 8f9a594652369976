//! Conflict resolution between local and server versions of an entity.
//!
//! Pure functions, no I/O. The decision table: a completed inspection is
//! immutable so the server version always wins; otherwise the newer
//! timestamp wins; on a tie, inspections take the server version and
//! entries are field-merged.
//!
//! Conflict detection is a heuristic, not causal tracking: two writes
//! within [`CONFLICT_WINDOW_MS`] of each other whose payloads differ are
//! treated as concurrent.

use serde_json::{json, Map, Value};

use crate::models::{Inspection, InspectionEntry, SyncStatus};
use crate::util::strip_scheme;

/// Two writes this close together with differing payloads count as a
/// conflict.
pub const CONFLICT_WINDOW_MS: i64 = 1000;

const LAST_WRITE_WINS: &str = "last-write-wins";
const FIELD_MERGE: &str = "field-merge";
const COMPLETED_WINS: &str = "completed-wins";

const NOTE_MERGE_SEPARATOR: &str = "\n--- merged note ---\n";

/// Payload sub-fields merged by prefer-non-empty instead of plain local
/// precedence.
const PREFER_NON_EMPTY_KEYS: [&str; 2] = ["condition", "cleanliness"];

/// Which side a resolution kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Server,
    Local,
    Merged,
}

impl Winner {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Local => "local",
            Self::Merged => "merged",
        }
    }
}

/// Outcome of resolving two versions of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub winner: Winner,
    /// Strategy name recorded in the conflict log.
    pub strategy: &'static str,
    pub entity: T,
}

/// Resolve divergent copies of an inspection.
#[must_use]
pub fn resolve_inspection(local: Inspection, server: Inspection) -> Resolution<Inspection> {
    if local.is_completed() || server.is_completed() {
        return Resolution {
            winner: Winner::Server,
            strategy: COMPLETED_WINS,
            entity: server,
        };
    }

    if local.updated_at > server.updated_at {
        Resolution {
            winner: Winner::Local,
            strategy: LAST_WRITE_WINS,
            entity: local,
        }
    } else {
        // Ties go to the server as the single source of truth
        Resolution {
            winner: Winner::Server,
            strategy: LAST_WRITE_WINS,
            entity: server,
        }
    }
}

/// Resolve divergent copies of an entry. Equal timestamps produce a merged
/// entry that still needs upload.
#[must_use]
pub fn resolve_entry(local: InspectionEntry, server: InspectionEntry) -> Resolution<InspectionEntry> {
    if server.updated_at > local.updated_at {
        Resolution {
            winner: Winner::Server,
            strategy: LAST_WRITE_WINS,
            entity: server,
        }
    } else if local.updated_at > server.updated_at {
        Resolution {
            winner: Winner::Local,
            strategy: LAST_WRITE_WINS,
            entity: local,
        }
    } else {
        Resolution {
            winner: Winner::Merged,
            strategy: FIELD_MERGE,
            entity: merge_entries(local, server),
        }
    }
}

/// Heuristic check for concurrent edits to the same entry.
#[must_use]
pub fn entries_conflict(local: &InspectionEntry, server: &InspectionEntry) -> bool {
    within_window(local.updated_at, server.updated_at)
        && entry_content(local) != entry_content(server)
}

/// Heuristic check for concurrent edits to the same inspection.
#[must_use]
pub fn inspections_conflict(local: &Inspection, server: &Inspection) -> bool {
    within_window(local.updated_at, server.updated_at) && local.status != server.status
}

fn within_window(a: i64, b: i64) -> bool {
    (a - b).abs() <= CONFLICT_WINDOW_MS
}

fn entry_content(entry: &InspectionEntry) -> Value {
    json!({
        "value": entry.value,
        "note": entry.note,
        "photos": entry.photos,
        "maintenanceFlag": entry.maintenance_flag,
        "markedForReview": entry.marked_for_review,
    })
}

/// Field-merge two entry versions. The server copy is the base, so the
/// server id and created_at survive; the result is marked conflict
/// because it matches neither input, and stays so until the next push
/// lands it on the server.
fn merge_entries(local: InspectionEntry, server: InspectionEntry) -> InspectionEntry {
    let value = merge_values(&server.value, &local.value);
    let note = merge_notes(server.note.as_deref(), local.note.as_deref());
    let photos = merge_photos(&server.photos, &local.photos);

    InspectionEntry {
        value,
        note,
        photos,
        maintenance_flag: server.maintenance_flag || local.maintenance_flag,
        marked_for_review: server.marked_for_review || local.marked_for_review,
        updated_at: server.updated_at.max(local.updated_at),
        sync_status: SyncStatus::Conflict,
        ..server
    }
}

/// Union of both photo lists, deduplicated by scheme-stripped path, server
/// paths before local ones.
///
/// No content or identity correlation: a local `file://` path and the
/// server URL of the same physical photo are distinct strings and both
/// survive. Pinned by tests until product clarifies the intended
/// drop-local-equivalent rule.
fn merge_photos(server: &[String], local: &[String]) -> Vec<String> {
    let mut merged = Vec::new();
    let mut seen: Vec<&str> = Vec::new();

    for path in server.iter().chain(local.iter()) {
        let normalized = strip_scheme(path);
        if seen.contains(&normalized) {
            continue;
        }
        seen.push(normalized);
        merged.push(path.clone());
    }

    merged
}

/// Both notes survive a merge: server text first, then local, joined by a
/// marker. Identical or one-sided notes pass through unchanged.
fn merge_notes(server: Option<&str>, local: Option<&str>) -> Option<String> {
    match (server, local) {
        (Some(server), Some(local)) if server != local => {
            Some(format!("{server}{NOTE_MERGE_SEPARATOR}{local}"))
        }
        (Some(server), _) => Some(server.to_string()),
        (None, Some(local)) => Some(local.to_string()),
        (None, None) => None,
    }
}

/// Shallow-merge two value payloads with local precedence on key
/// collisions; `condition` and `cleanliness` collisions prefer whichever
/// side is non-empty.
fn merge_values(server: &Value, local: &Value) -> Value {
    match (server, local) {
        (Value::Object(server), Value::Object(local)) => {
            let mut out: Map<String, Value> = server.clone();
            for (key, local_value) in local {
                let merged = if PREFER_NON_EMPTY_KEYS.contains(&key.as_str()) {
                    prefer_non_empty(out.get(key), local_value)
                } else {
                    local_value.clone()
                };
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        (server, Value::Null) => server.clone(),
        (_, local) => local.clone(),
    }
}

fn prefer_non_empty(server: Option<&Value>, local: &Value) -> Value {
    if is_empty_value(local) {
        if let Some(server) = server {
            if !is_empty_value(server) {
                return server.clone();
            }
        }
    }
    local.clone()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}
