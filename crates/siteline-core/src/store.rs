//! Local store facade
//!
//! [`LocalStore`] is the one handle the rest of the crate talks to for
//! durable device state. It wraps the database behind `Arc<Mutex<..>>` so it
//! can be cloned into the sync service, the background loop, and the CLI.
//!
//! Failure posture: opening never fails. When the database cannot be opened
//! the handle comes up degraded; writes are dropped with a warning and reads
//! return empty, so capture keeps working online-only. Validation failures
//! are domain errors and still fail fast before any storage is touched.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    ConflictRepository, Database, EntryRepository, ImageRepository, InspectionRepository,
    LibSqlConflictRepository, LibSqlEntryRepository, LibSqlImageRepository,
    LibSqlInspectionRepository, LibSqlMetaRepository, LibSqlQueueRepository, MetaRepository,
    QueueRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    EntryChanges, ImageStatus, Inspection, InspectionEntry, InspectionStatus, LocalImage,
    NewOperation, QueuedOperation, RecordId, ResolvedConflict, SyncStatus,
};

fn warn_dropped(operation: &str) {
    tracing::warn!(operation, "Local store degraded; write dropped");
}

fn warn_failed(operation: &str, error: &Error) {
    tracing::warn!(operation, %error, "Local store operation failed");
}

/// Handle to the device-local database.
#[derive(Clone)]
pub struct LocalStore {
    db: Option<Arc<Mutex<Database>>>,
}

impl LocalStore {
    /// Open the store at the given path, creating the file and parent
    /// directory as needed.
    ///
    /// Never fails: when storage cannot be initialized the returned handle
    /// is degraded and the app continues online-only.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if let Err(error) = std::fs::create_dir_all(parent) {
                tracing::error!(%error, ?path, "Local storage unavailable; continuing online-only");
                return Self { db: None };
            }
        }

        match Database::open(path).await {
            Ok(db) => Self {
                db: Some(Arc::new(Mutex::new(db))),
            },
            Err(error) => {
                tracing::error!(%error, ?path, "Local storage unavailable; continuing online-only");
                Self { db: None }
            }
        }
    }

    /// Open an in-memory store (useful for testing)
    pub async fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Some(Arc::new(Mutex::new(db))),
        })
    }

    /// True when storage initialization failed and writes are being dropped.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.db.is_none()
    }

    // --- inspections ---

    /// Insert or update an inspection mirror row.
    pub async fn save_inspection(&self, inspection: &Inspection) {
        let Some(db) = &self.db else {
            warn_dropped("save_inspection");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        if let Err(error) = repo.save(inspection).await {
            warn_failed("save_inspection", &error);
        }
    }

    /// Point lookup, optionally scoped to an owner account.
    pub async fn inspection(
        &self,
        id: &RecordId,
        owner_scope: Option<&str>,
    ) -> Option<Inspection> {
        let db = self.db.as_ref()?.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        match repo.get(id, owner_scope).await {
            Ok(found) => found,
            Err(error) => {
                warn_failed("inspection", &error);
                None
            }
        }
    }

    /// Inspections for an owner, most recently updated first.
    pub async fn inspections_for(&self, owner_id: &str) -> Vec<Inspection> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        match repo.list_for_owner(owner_id).await {
            Ok(inspections) => inspections,
            Err(error) => {
                warn_failed("inspections_for", &error);
                Vec::new()
            }
        }
    }

    /// Identifiers of every known inspection.
    pub async fn inspection_ids(&self) -> Vec<RecordId> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        match repo.ids().await {
            Ok(ids) => ids,
            Err(error) => {
                warn_failed("inspection_ids", &error);
                Vec::new()
            }
        }
    }

    /// Update an inspection's lifecycle and sync status together.
    ///
    /// Returns [`Error::NotFound`] for an unknown inspection; storage
    /// failures are swallowed.
    pub async fn set_inspection_status(
        &self,
        id: &RecordId,
        status: InspectionStatus,
        sync_status: SyncStatus,
    ) -> Result<()> {
        let Some(db) = &self.db else {
            warn_dropped("set_inspection_status");
            return Ok(());
        };
        let db = db.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        match repo.set_status(id, status, sync_status).await {
            Ok(()) => Ok(()),
            Err(error @ Error::NotFound(_)) => Err(error),
            Err(error) => {
                warn_failed("set_inspection_status", &error);
                Ok(())
            }
        }
    }

    /// Mark an inspection's local copy as matching the server.
    pub async fn mark_inspection_synced(&self, id: &RecordId) {
        let Some(db) = &self.db else {
            warn_dropped("mark_inspection_synced");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        if let Err(error) = repo.set_sync_status(id, SyncStatus::Synced).await {
            warn_failed("mark_inspection_synced", &error);
        }
    }

    /// Remove every row not owned by the given account. Run at login.
    pub async fn purge_not_owned(&self, owner_id: &str) -> u64 {
        let Some(db) = &self.db else {
            warn_dropped("purge_not_owned");
            return 0;
        };
        let db = db.lock().await;
        let repo = LibSqlInspectionRepository::new(db.connection());
        match repo.purge_not_owned(owner_id).await {
            Ok(removed) => removed,
            Err(error) => {
                warn_failed("purge_not_owned", &error);
                0
            }
        }
    }

    // --- entries ---

    /// Upsert an entry by its natural key.
    ///
    /// Fails fast with [`Error::InvalidInput`] before touching storage when
    /// the natural key is incomplete, degraded or not.
    pub async fn save_entry(&self, entry: &InspectionEntry) -> Result<()> {
        entry.validate()?;

        let Some(db) = &self.db else {
            warn_dropped("save_entry");
            return Ok(());
        };
        let db = db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        match repo.save(entry).await {
            Ok(()) => Ok(()),
            Err(error @ Error::InvalidInput(_)) => Err(error),
            Err(error) => {
                warn_failed("save_entry", &error);
                Ok(())
            }
        }
    }

    /// Apply a partial change set; `None` when the entry does not exist or
    /// storage is unavailable.
    pub async fn update_entry(
        &self,
        id: &RecordId,
        changes: EntryChanges,
    ) -> Option<InspectionEntry> {
        let db = self.db.as_ref().or_else(|| {
            warn_dropped("update_entry");
            None
        })?;
        let db = db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        match repo.update(id, changes).await {
            Ok(entry) => Some(entry),
            Err(Error::NotFound(_)) => None,
            Err(error) => {
                warn_failed("update_entry", &error);
                None
            }
        }
    }

    /// Get an entry by id.
    pub async fn entry(&self, id: &RecordId) -> Option<InspectionEntry> {
        let db = self.db.as_ref()?.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        match repo.get(id).await {
            Ok(found) => found,
            Err(error) => {
                warn_failed("entry", &error);
                None
            }
        }
    }

    /// Get an entry by its natural key.
    pub async fn entry_by_key(
        &self,
        inspection_id: &RecordId,
        section_ref: &str,
        field_key: &str,
    ) -> Option<InspectionEntry> {
        let db = self.db.as_ref()?.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        match repo.get_by_key(inspection_id, section_ref, field_key).await {
            Ok(found) => found,
            Err(error) => {
                warn_failed("entry_by_key", &error);
                None
            }
        }
    }

    /// Entries for an inspection in section/field order.
    pub async fn entries_for(&self, inspection_id: &RecordId) -> Vec<InspectionEntry> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        match repo.list_for_inspection(inspection_id).await {
            Ok(entries) => entries,
            Err(error) => {
                warn_failed("entries_for", &error);
                Vec::new()
            }
        }
    }

    /// Replace a local entry id with the server-assigned one everywhere it
    /// appears: the entry row, queued operation targets, and image rows.
    pub async fn rekey_entry(&self, old_id: &RecordId, new_id: &RecordId) {
        let Some(db) = &self.db else {
            warn_dropped("rekey_entry");
            return;
        };
        let db = db.lock().await;

        let entries = LibSqlEntryRepository::new(db.connection());
        if let Err(error) = entries.rekey(old_id, new_id).await {
            warn_failed("rekey_entry", &error);
            return;
        }

        let queue = LibSqlQueueRepository::new(db.connection());
        if let Err(error) = queue.retarget(old_id, new_id).await {
            warn_failed("rekey_entry", &error);
        }

        let images = LibSqlImageRepository::new(db.connection());
        if let Err(error) = images.retarget_entry(old_id, new_id).await {
            warn_failed("rekey_entry", &error);
        }
    }

    /// Mark an entry's local copy as matching the server.
    pub async fn mark_entry_synced(&self, id: &RecordId) {
        let Some(db) = &self.db else {
            warn_dropped("mark_entry_synced");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        if let Err(error) = repo.set_sync_status(id, SyncStatus::Synced).await {
            warn_failed("mark_entry_synced", &error);
        }
    }

    /// Delete an entry row.
    pub async fn delete_entry(&self, id: &RecordId) {
        let Some(db) = &self.db else {
            warn_dropped("delete_entry");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        if let Err(error) = repo.delete(id).await {
            warn_failed("delete_entry", &error);
        }
    }

    // --- sync queue ---

    /// Append an operation to the durable queue; returns the generated id,
    /// or `None` when storage is unavailable.
    pub async fn enqueue(&self, operation: NewOperation) -> Option<i64> {
        let db = self.db.as_ref().or_else(|| {
            warn_dropped("enqueue");
            None
        })?;
        let db = db.lock().await;
        let repo = LibSqlQueueRepository::new(db.connection());
        match repo.enqueue(&operation).await {
            Ok(id) => Some(id),
            Err(error) => {
                warn_failed("enqueue", &error);
                None
            }
        }
    }

    /// Remove a queued operation after it succeeded or was dropped.
    pub async fn dequeue(&self, operation_id: i64) {
        let Some(db) = &self.db else {
            warn_dropped("dequeue");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlQueueRepository::new(db.connection());
        if let Err(error) = repo.remove(operation_id).await {
            warn_failed("dequeue", &error);
        }
    }

    /// Queued operations in drain order: priority band, then FIFO.
    pub async fn pending_operations(&self) -> Vec<QueuedOperation> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlQueueRepository::new(db.connection());
        match repo.pending().await {
            Ok(operations) => operations,
            Err(error) => {
                warn_failed("pending_operations", &error);
                Vec::new()
            }
        }
    }

    /// Record a failed attempt; returns the updated retry count.
    pub async fn record_retry(&self, operation_id: i64, error_message: &str) -> i64 {
        let Some(db) = &self.db else {
            warn_dropped("record_retry");
            return 0;
        };
        let db = db.lock().await;
        let repo = LibSqlQueueRepository::new(db.connection());
        match repo.record_failure(operation_id, error_message).await {
            Ok(count) => count,
            Err(error) => {
                warn_failed("record_retry", &error);
                0
            }
        }
    }

    /// Number of operations waiting to sync.
    pub async fn queue_depth(&self) -> u64 {
        let Some(db) = &self.db else {
            return 0;
        };
        let db = db.lock().await;
        let repo = LibSqlQueueRepository::new(db.connection());
        match repo.depth().await {
            Ok(depth) => depth,
            Err(error) => {
                warn_failed("queue_depth", &error);
                0
            }
        }
    }

    // --- images ---

    /// Insert or refresh an image metadata row.
    pub async fn save_image(&self, image: &LocalImage) {
        let Some(db) = &self.db else {
            warn_dropped("save_image");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        if let Err(error) = repo.save(image).await {
            warn_failed("save_image", &error);
        }
    }

    /// Get an image by local path.
    pub async fn image(&self, local_path: &str) -> Option<LocalImage> {
        let db = self.db.as_ref()?.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        match repo.get(local_path).await {
            Ok(found) => found,
            Err(error) => {
                warn_failed("image", &error);
                None
            }
        }
    }

    /// Move an image through its upload lifecycle.
    pub async fn set_image_status(&self, local_path: &str, status: ImageStatus) {
        let Some(db) = &self.db else {
            warn_dropped("set_image_status");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        if let Err(error) = repo.set_status(local_path, status).await {
            warn_failed("set_image_status", &error);
        }
    }

    /// Record the durable server URL for an uploaded image.
    pub async fn promote_image(&self, local_path: &str, server_url: &str) {
        let Some(db) = &self.db else {
            warn_dropped("promote_image");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        if let Err(error) = repo.promote(local_path, server_url).await {
            warn_failed("promote_image", &error);
        }
    }

    /// All tracked images, newest first.
    pub async fn images(&self) -> Vec<LocalImage> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        match repo.list().await {
            Ok(images) => images,
            Err(error) => {
                warn_failed("images", &error);
                Vec::new()
            }
        }
    }

    /// Images currently in the given lifecycle state.
    pub async fn images_with_status(&self, status: ImageStatus) -> Vec<LocalImage> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        match repo.with_status(status).await {
            Ok(images) => images,
            Err(error) => {
                warn_failed("images_with_status", &error);
                Vec::new()
            }
        }
    }

    /// Uploaded images captured before the cutoff.
    pub async fn images_uploaded_before(&self, cutoff_ms: i64) -> Vec<LocalImage> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        match repo.uploaded_before(cutoff_ms).await {
            Ok(images) => images,
            Err(error) => {
                warn_failed("images_uploaded_before", &error);
                Vec::new()
            }
        }
    }

    /// Delete an image metadata row.
    pub async fn remove_image(&self, local_path: &str) {
        let Some(db) = &self.db else {
            warn_dropped("remove_image");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlImageRepository::new(db.connection());
        if let Err(error) = repo.remove(local_path).await {
            warn_failed("remove_image", &error);
        }
    }

    // --- conflict log and sync metadata ---

    /// Record a resolver decision in the conflict log.
    pub async fn record_conflict(
        &self,
        entity_kind: &str,
        entity_id: &str,
        local_updated_at: i64,
        server_updated_at: i64,
        winner: &str,
        strategy: &str,
    ) {
        let Some(db) = &self.db else {
            warn_dropped("record_conflict");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlConflictRepository::new(db.connection());
        if let Err(error) = repo
            .record(
                entity_kind,
                entity_id,
                local_updated_at,
                server_updated_at,
                winner,
                strategy,
            )
            .await
        {
            warn_failed("record_conflict", &error);
        }
    }

    /// Most recently resolved conflicts.
    pub async fn recent_conflicts(&self, limit: usize) -> Vec<ResolvedConflict> {
        let Some(db) = &self.db else {
            return Vec::new();
        };
        let db = db.lock().await;
        let repo = LibSqlConflictRepository::new(db.connection());
        match repo.recent(limit).await {
            Ok(conflicts) => conflicts,
            Err(error) => {
                warn_failed("recent_conflicts", &error);
                Vec::new()
            }
        }
    }

    /// Read a sync metadata value.
    pub async fn meta(&self, key: &str) -> Option<String> {
        let db = self.db.as_ref()?.lock().await;
        let repo = LibSqlMetaRepository::new(db.connection());
        match repo.get(key).await {
            Ok(value) => value,
            Err(error) => {
                warn_failed("meta", &error);
                None
            }
        }
    }

    /// Write a sync metadata value.
    pub async fn set_meta(&self, key: &str, value: &str) {
        let Some(db) = &self.db else {
            warn_dropped("set_meta");
            return;
        };
        let db = db.lock().await;
        let repo = LibSqlMetaRepository::new(db.connection());
        if let Err(error) = repo.set(key, value).await {
            warn_failed("set_meta", &error);
        }
    }
}
