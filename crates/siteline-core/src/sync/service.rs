//! Sync engine.
//!
//! `sync_all` runs one full cycle: connectivity gate, single-flight guard,
//! drain the outbound queue in priority order, then pull server changes
//! for every known inspection and fold them in through the resolver.
//! Failures ride the queue's retry counter and come back as aggregate
//! counts; a cycle never unwinds into the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::config::SyncSettings;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, Result};
use crate::images::ImageStore;
use crate::models::{
    InspectionEntry, InspectionStatus, LocalImage, NewOperation, OperationKind, QueuedOperation,
    RecordId, SyncStatus,
};
use crate::resolver::{self, Winner};
use crate::store::LocalStore;
use crate::util::strip_scheme;

/// Coarse sync status for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Syncing,
    Synced,
    Error,
}

impl SyncState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

/// Aggregate counts from one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Queued operations confirmed by the server.
    pub uploaded: u64,
    /// Server-side records applied locally.
    pub downloaded: u64,
    /// Operations or pulls that failed this cycle.
    pub failed: u64,
    /// True when nothing failed.
    pub success: bool,
}

type DropListener = Box<dyn Fn(&QueuedOperation) + Send + Sync>;

struct ServiceInner {
    store: LocalStore,
    images: ImageStore,
    api: ApiClient,
    monitor: ConnectivityMonitor,
    settings: SyncSettings,
    syncing: AtomicBool,
    last_failed: AtomicBool,
    last_attempt: Mutex<Option<Instant>>,
    drop_listeners: Mutex<Vec<DropListener>>,
}

/// Drives queue drainage and reconciliation; cheap to clone.
#[derive(Clone)]
pub struct SyncService {
    inner: Arc<ServiceInner>,
}

impl SyncService {
    #[must_use]
    pub fn new(
        store: LocalStore,
        images: ImageStore,
        api: ApiClient,
        monitor: ConnectivityMonitor,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                store,
                images,
                api,
                monitor,
                settings,
                syncing: AtomicBool::new(false),
                last_failed: AtomicBool::new(false),
                last_attempt: Mutex::new(None),
                drop_listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a callback invoked when an operation exhausts its retries
    /// and is dropped from the queue.
    pub fn on_drop(&self, listener: impl Fn(&QueuedOperation) + Send + Sync + 'static) {
        let mut listeners = self
            .inner
            .drop_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.push(Box::new(listener));
    }

    /// Coarse state for display.
    #[must_use]
    pub fn state(&self) -> SyncState {
        if self.inner.syncing.load(Ordering::SeqCst) {
            return SyncState::Syncing;
        }
        if !self.inner.monitor.is_online() {
            return SyncState::Offline;
        }
        if self.inner.last_failed.load(Ordering::SeqCst) {
            SyncState::Error
        } else {
            SyncState::Synced
        }
    }

    /// Start a cycle right now, bypassing the automatic throttle.
    ///
    /// Errors with [`Error::Offline`] when the server is unreachable and
    /// [`Error::SyncInProgress`] when a cycle is already running.
    pub async fn trigger_sync(&self) -> Result<SyncOutcome> {
        self.sync_all(true).await
    }

    /// Run one sync cycle. Automatic callers pass `force = false` and get
    /// an empty successful outcome when the attempt is throttled.
    pub async fn sync_all(&self, force: bool) -> Result<SyncOutcome> {
        if !self.inner.monitor.is_online() {
            return Err(Error::Offline);
        }
        if !force && self.throttled() {
            tracing::debug!("Sync attempt throttled");
            return Ok(SyncOutcome {
                success: true,
                ..SyncOutcome::default()
            });
        }
        if self
            .inner
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::SyncInProgress);
        }

        let outcome = self.run_cycle().await;

        self.inner
            .last_failed
            .store(!outcome.success, Ordering::SeqCst);
        self.inner.syncing.store(false, Ordering::SeqCst);

        tracing::info!(
            uploaded = outcome.uploaded,
            downloaded = outcome.downloaded,
            failed = outcome.failed,
            "Sync cycle finished"
        );
        Ok(outcome)
    }

    async fn run_cycle(&self) -> SyncOutcome {
        self.note_attempt();
        let mut outcome = SyncOutcome::default();

        self.push_queue(&mut outcome).await;
        self.pull_all(&mut outcome).await;

        outcome.success = outcome.failed == 0;
        outcome
    }

    /// Drain the queue in priority-then-FIFO order. One failing operation
    /// never blocks the ones behind it.
    async fn push_queue(&self, outcome: &mut SyncOutcome) {
        for operation in self.inner.store.pending_operations().await {
            match self.dispatch(&operation).await {
                Ok(()) => {
                    self.inner.store.dequeue(operation.id).await;
                    outcome.uploaded += 1;
                }
                Err(error) => {
                    outcome.failed += 1;
                    let mut failed = operation;
                    failed.retry_count = self
                        .inner
                        .store
                        .record_retry(failed.id, &error.to_string())
                        .await;
                    failed.last_error = Some(error.to_string());

                    if failed.has_retries_left(self.inner.settings.max_retries) {
                        tracing::debug!(
                            operation = failed.kind.as_str(),
                            retries = failed.retry_count,
                            %error,
                            "Operation failed; will retry"
                        );
                    } else {
                        tracing::warn!(
                            operation = failed.kind.as_str(),
                            target = failed.target_id.as_str(),
                            retries = failed.retry_count,
                            %error,
                            "Operation dropped after exhausting retries"
                        );
                        self.inner.store.dequeue(failed.id).await;
                        self.notify_drop(&failed);
                    }
                }
            }
        }
    }

    async fn dispatch(&self, operation: &QueuedOperation) -> Result<()> {
        match operation.kind {
            OperationKind::CreateEntry | OperationKind::UpdateEntry => {
                let Some(entry) = self.inner.store.entry(&operation.target_id).await else {
                    tracing::debug!(
                        target = operation.target_id.as_str(),
                        "Entry no longer exists; dropping operation"
                    );
                    return Ok(());
                };
                self.push_entry(entry).await
            }
            OperationKind::DeleteEntry => {
                // A local-only id never reached the server; the local
                // delete already happened
                if operation.target_id.is_local() {
                    return Ok(());
                }
                self.inner.api.delete_entry(&operation.target_id).await
            }
            OperationKind::UploadImage => self.upload_image(operation).await,
            OperationKind::CompleteInspection => {
                let status = operation
                    .payload
                    .get("status")
                    .and_then(Value::as_str)
                    .and_then(|status| status.parse().ok())
                    .unwrap_or(InspectionStatus::Completed);
                self.inner
                    .api
                    .set_inspection_status(&operation.target_id, status)
                    .await?;
                self.inner
                    .store
                    .mark_inspection_synced(&operation.target_id)
                    .await;
                Ok(())
            }
        }
    }

    /// Entries created offline carry a local id and POST; ids the server
    /// assigned PATCH. A successful create rekeys the local id everywhere.
    async fn push_entry(&self, entry: InspectionEntry) -> Result<()> {
        if entry.id.is_local() {
            let created = self.inner.api.create_entry(&entry).await?;
            let server_id = created.id.clone();
            self.inner.store.rekey_entry(&entry.id, &server_id).await;
            self.inner.store.mark_entry_synced(&server_id).await;
        } else {
            self.inner.api.update_entry(&entry).await?;
            self.inner.store.mark_entry_synced(&entry.id).await;
        }
        Ok(())
    }

    async fn upload_image(&self, operation: &QueuedOperation) -> Result<()> {
        let Some(path) = operation.payload.get("path").and_then(Value::as_str) else {
            tracing::warn!(id = operation.id, "Upload operation without a path; dropping");
            return Ok(());
        };
        let Some(image) = self.inner.store.image(path).await else {
            tracing::debug!(path, "Image record no longer exists; dropping upload");
            return Ok(());
        };

        // A crash between upload and dequeue leaves a completed row behind
        if let Some(url) = image.server_url.clone().filter(|_| image.is_uploaded()) {
            self.substitute_photo_url(&image, &url).await;
            return Ok(());
        }

        self.inner.images.mark_uploading(path).await;
        match self.inner.api.upload_photo(&image).await {
            Ok(url) => {
                self.inner.images.promote_to_server_url(path, &url).await;
                self.substitute_photo_url(&image, &url).await;
                Ok(())
            }
            Err(error) => {
                self.inner.images.mark_failed(path).await;
                Err(error)
            }
        }
    }

    /// Swap the uploaded photo's local path for its server URL in the
    /// owning entry and queue a content push so the server learns it.
    async fn substitute_photo_url(&self, image: &LocalImage, url: &str) {
        let Some(entry_id) = &image.entry_id else {
            return;
        };
        let Some(mut entry) = self.inner.store.entry(entry_id).await else {
            return;
        };

        let target = strip_scheme(&image.local_path).to_string();
        let mut changed = false;
        for photo in &mut entry.photos {
            if strip_scheme(photo) == target {
                url.clone_into(photo);
                changed = true;
            }
        }
        if !changed {
            return;
        }

        // The URL may already be present from an earlier pull
        let mut seen: Vec<String> = Vec::new();
        entry.photos.retain(|photo| {
            let normalized = strip_scheme(photo).to_string();
            if seen.contains(&normalized) {
                false
            } else {
                seen.push(normalized);
                true
            }
        });

        entry.updated_at = chrono::Utc::now().timestamp_millis();
        entry.sync_status = SyncStatus::Pending;
        if let Err(error) = self.inner.store.save_entry(&entry).await {
            tracing::warn!(%error, "Failed to record uploaded photo URL on entry");
            return;
        }
        self.inner
            .store
            .enqueue(NewOperation::new(
                OperationKind::UpdateEntry,
                entry.id.clone(),
                json!({}),
            ))
            .await;
    }

    async fn pull_all(&self, outcome: &mut SyncOutcome) {
        for id in self.inner.store.inspection_ids().await {
            match self.pull_inspection(&id).await {
                Ok(downloaded) => outcome.downloaded += downloaded,
                Err(error) => {
                    tracing::warn!(inspection = id.as_str(), %error, "Pull failed");
                    outcome.failed += 1;
                }
            }
        }
    }

    /// Fetch one inspection and its changed entries, folding both through
    /// the resolver. Entry listing is incremental via an `updated_after`
    /// cursor kept in sync metadata.
    async fn pull_inspection(&self, id: &RecordId) -> Result<u64> {
        let mut downloaded = 0;

        let server = self.inner.api.inspection(id).await?;
        match self.inner.store.inspection(id, None).await {
            None => {
                self.inner.store.save_inspection(&server).await;
                downloaded += 1;
            }
            Some(local) if local == server => {}
            Some(local) => {
                let local_ts = local.updated_at;
                let server_ts = server.updated_at;
                let conflicted = resolver::inspections_conflict(&local, &server);
                let resolution = resolver::resolve_inspection(local, server);

                if conflicted {
                    self.inner
                        .store
                        .record_conflict(
                            "inspection",
                            id.as_str(),
                            local_ts,
                            server_ts,
                            resolution.winner.as_str(),
                            resolution.strategy,
                        )
                        .await;
                }
                if resolution.winner != Winner::Local {
                    self.inner.store.save_inspection(&resolution.entity).await;
                    downloaded += 1;
                }
            }
        }

        let cursor_key = format!("cursor:{}", id.as_str());
        let cursor = self
            .inner
            .store
            .meta(&cursor_key)
            .await
            .and_then(|value| value.parse::<i64>().ok());

        let entries = self.inner.api.entries(id, cursor).await?;
        let mut newest = cursor.unwrap_or(0);
        for server_entry in entries {
            newest = newest.max(server_entry.updated_at);
            downloaded += self.apply_server_entry(server_entry).await;
        }
        if newest > cursor.unwrap_or(0) {
            self.inner
                .store
                .set_meta(&cursor_key, &newest.to_string())
                .await;
        }

        Ok(downloaded)
    }

    /// Fold one server entry into the store. Returns 1 when a row was
    /// written. Natural-key lookup catches rows still under a local id.
    async fn apply_server_entry(&self, server: InspectionEntry) -> u64 {
        let local = self
            .inner
            .store
            .entry_by_key(&server.inspection_id, &server.section_ref, &server.field_key)
            .await;

        let Some(mut local) = local else {
            if let Err(error) = self.inner.store.save_entry(&server).await {
                tracing::warn!(%error, "Failed to apply server entry");
                return 0;
            }
            return 1;
        };

        if local == server {
            return 0;
        }

        // A create whose response was lost leaves the row under its local
        // id; rekey so the resolved row and queued operations use the
        // server id
        if local.id != server.id && local.id.is_local() {
            self.inner.store.rekey_entry(&local.id, &server.id).await;
            local.id = server.id.clone();
        }

        let local_ts = local.updated_at;
        let server_ts = server.updated_at;
        let conflicted = resolver::entries_conflict(&local, &server);
        let resolution = resolver::resolve_entry(local, server);

        if conflicted {
            self.inner
                .store
                .record_conflict(
                    "entry",
                    resolution.entity.id.as_str(),
                    local_ts,
                    server_ts,
                    resolution.winner.as_str(),
                    resolution.strategy,
                )
                .await;
        }

        match resolution.winner {
            Winner::Local => 0,
            Winner::Server | Winner::Merged => {
                if let Err(error) = self.inner.store.save_entry(&resolution.entity).await {
                    tracing::warn!(%error, "Failed to apply resolved entry");
                    return 0;
                }
                if resolution.winner == Winner::Merged {
                    // Merged content matches neither side; push it back up
                    self.inner
                        .store
                        .enqueue(NewOperation::new(
                            OperationKind::UpdateEntry,
                            resolution.entity.id.clone(),
                            json!({}),
                        ))
                        .await;
                }
                1
            }
        }
    }

    fn throttled(&self) -> bool {
        let last = self
            .inner
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        last.is_some_and(|at| at.elapsed() < self.inner.settings.sync_throttle)
    }

    fn note_attempt(&self) {
        let mut last = self
            .inner
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = Some(Instant::now());
    }

    fn notify_drop(&self, operation: &QueuedOperation) {
        let listeners = self
            .inner
            .drop_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(operation);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::connectivity::ConnectionState;
    use crate::models::{Inspection, TemplateSnapshot};
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        service: SyncService,
        store: LocalStore,
        monitor: ConnectivityMonitor,
        tmp: TempDir,
    }

    async fn fixture(base_url: &str, configure: impl FnOnce(&mut SyncSettings)) -> Fixture {
        let mut settings = SyncSettings::new(base_url, "acct_1");
        settings.sync_throttle = Duration::ZERO;
        configure(&mut settings);

        let store = LocalStore::in_memory().await.unwrap();
        let tmp = tempdir().unwrap();
        let images = ImageStore::new(tmp.path(), store.clone());
        let api = ApiClient::new(&settings).unwrap();
        let monitor = ConnectivityMonitor::new(&settings).unwrap();
        monitor.set_state_for_tests(ConnectionState::Online);

        let service = SyncService::new(store.clone(), images, api, monitor.clone(), settings);
        Fixture {
            service,
            store,
            monitor,
            tmp,
        }
    }

    fn inspection(id: &str) -> Inspection {
        Inspection::new(
            RecordId::from(id),
            "acct_1",
            "unit-7",
            TemplateSnapshot {
                name: "Routine".to_string(),
                sections: Vec::new(),
            },
        )
    }

    fn inspection_json(id: &str, updated_at: i64) -> serde_json::Value {
        json!({
            "id": id,
            "ownerId": "acct_1",
            "targetRef": "unit-7",
            "template": {"name": "Routine", "sections": []},
            "status": "in_progress",
            "createdAt": 1000,
            "updatedAt": updated_at,
        })
    }

    fn entry_json(id: &str, note: &str, updated_at: i64) -> serde_json::Value {
        json!({
            "id": id,
            "inspectionId": "ins_1",
            "sectionRef": "kitchen",
            "fieldKey": "sink",
            "value": {"condition": "worn"},
            "note": note,
            "photos": [],
            "maintenanceFlag": false,
            "markedForReview": false,
            "createdAt": 1000,
            "updatedAt": updated_at,
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_errors_when_offline() {
        let fx = fixture("http://127.0.0.1:1", |_| {}).await;
        fx.monitor.set_state_for_tests(ConnectionState::Offline);

        assert!(matches!(fx.service.sync_all(false).await, Err(Error::Offline)));
        assert!(matches!(fx.service.trigger_sync().await, Err(Error::Offline)));
        assert_eq!(fx.service.state(), SyncState::Offline);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_created_entry_syncs_under_server_id() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |_| {}).await;

        fx.store.save_inspection(&inspection("ins_1")).await;
        let entry = InspectionEntry::new(RecordId::from("ins_1"), "kitchen", "sink").unwrap();
        let local_id = entry.id.clone();
        fx.store.save_entry(&entry).await.unwrap();
        fx.store
            .enqueue(NewOperation::new(
                OperationKind::CreateEntry,
                local_id.clone(),
                json!({}),
            ))
            .await
            .unwrap();

        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/inspection-entries");
                then.status(201)
                    .json_body(entry_json("ent_900", "", entry.updated_at));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(inspection_json("ins_1", 2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200).json_body(json!([]));
            })
            .await;

        let outcome = fx.service.sync_all(false).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.uploaded, 1);
        create.assert_hits_async(1).await;

        // Retrievable by server id, local id gone, queue empty
        let synced = fx.store.entry(&RecordId::from("ent_900")).await.unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert!(fx.store.entry(&local_id).await.is_none());
        assert_eq!(fx.store.queue_depth().await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_operation_dropped_after_max_retries() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |settings| {
            settings.max_retries = 3;
        })
        .await;

        fx.store.save_inspection(&inspection("ins_1")).await;
        let entry = InspectionEntry::new(RecordId::from("ins_1"), "kitchen", "sink").unwrap();
        fx.store.save_entry(&entry).await.unwrap();
        fx.store
            .enqueue(NewOperation::new(
                OperationKind::CreateEntry,
                entry.id.clone(),
                json!({}),
            ))
            .await
            .unwrap();

        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/inspection-entries");
                then.status(500).json_body(json!({"message": "database locked"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(inspection_json("ins_1", 2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200).json_body(json!([]));
            })
            .await;

        let dropped: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&dropped);
        fx.service.on_drop(move |operation| {
            seen.lock()
                .unwrap()
                .push(operation.last_error.clone().unwrap_or_default());
        });

        for _ in 0..3 {
            let outcome = fx.service.sync_all(false).await.unwrap();
            assert_eq!(outcome.failed, 1);
            assert!(!outcome.success);
        }

        // Dropped after the third failure and never attempted again
        assert_eq!(fx.store.queue_depth().await, 0);
        create.assert_hits_async(3).await;
        {
            let messages = dropped.lock().unwrap();
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("database locked"));
        }

        let outcome = fx.service.sync_all(false).await.unwrap();
        assert_eq!(outcome.failed, 0);
        create.assert_hits_async(3).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_trigger_sync_rejected_while_cycle_runs() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |_| {}).await;
        fx.store.save_inspection(&inspection("ins_1")).await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200)
                    .json_body(inspection_json("ins_1", 2000))
                    .delay(Duration::from_millis(500));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200).json_body(json!([]));
            })
            .await;

        let service = fx.service.clone();
        let running = tokio::spawn(async move { service.sync_all(false).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fx.service.state(), SyncState::Syncing);
        assert!(matches!(
            fx.service.trigger_sync().await,
            Err(Error::SyncInProgress)
        ));

        let outcome = running.await.unwrap().unwrap();
        assert!(outcome.success);
        assert_eq!(fx.service.state(), SyncState::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_equal_timestamp_pull_merges_and_logs_conflict() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |_| {}).await;

        fx.store.save_inspection(&inspection("ins_1")).await;
        let mut local = InspectionEntry::new(RecordId::from("ins_1"), "kitchen", "sink").unwrap();
        local.note = Some("broken tap".to_string());
        local.updated_at = 5_000;
        fx.store.save_entry(&local).await.unwrap();

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(inspection_json("ins_1", 2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200)
                    .json_body(json!([entry_json("ent_55", "tap replaced", 5_000)]));
            })
            .await;

        let outcome = fx.service.sync_all(false).await.unwrap();
        assert!(outcome.success);

        let merged = fx.store.entry(&RecordId::from("ent_55")).await.unwrap();
        assert_eq!(merged.sync_status, SyncStatus::Conflict);
        let note = merged.note.unwrap();
        assert!(note.contains("tap replaced"));
        assert!(note.contains("broken tap"));
        assert!(note.find("tap replaced").unwrap() < note.find("broken tap").unwrap());

        let conflicts = fx.store.recent_conflicts(10).await;
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].strategy, "field-merge");
        assert_eq!(conflicts[0].winner, "merged");

        // The merged content is queued to push back to the server
        let kinds: Vec<OperationKind> = fx
            .store
            .pending_operations()
            .await
            .into_iter()
            .map(|operation| operation.kind)
            .collect();
        assert_eq!(kinds, vec![OperationKind::UpdateEntry]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pulling_same_snapshot_twice_is_idempotent() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |_| {}).await;

        let mut known = inspection("ins_1");
        known.created_at = 400;
        known.updated_at = 500;
        fx.store.save_inspection(&known).await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(inspection_json("ins_1", 2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200)
                    .json_body(json!([entry_json("ent_55", "tap replaced", 5_000)]));
            })
            .await;

        let first = fx.service.sync_all(false).await.unwrap();
        assert_eq!(first.downloaded, 2);

        let second = fx.service.sync_all(false).await.unwrap();
        assert_eq!(second.downloaded, 0);

        let entries = fx.store.entries_for(&RecordId::from("ins_1")).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(fx.store.meta("cursor:ins_1").await.as_deref(), Some("5000"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_photo_upload_promotes_and_rewrites_entry() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |_| {}).await;

        fx.store.save_inspection(&inspection("ins_1")).await;

        let photo = fx.tmp.path().join("capture.jpg");
        std::fs::write(&photo, b"jpeg bytes").unwrap();
        let photo_path = photo.to_str().unwrap().to_string();

        let mut entry = InspectionEntry::new(RecordId::from("ins_1"), "kitchen", "sink").unwrap();
        entry.id = RecordId::from("ent_55");
        entry.photos = vec![photo_path.clone()];
        fx.store.save_entry(&entry).await.unwrap();
        fx.store
            .save_image(&LocalImage::new(
                photo_path.clone(),
                RecordId::from("ins_1"),
                Some(entry.id.clone()),
            ))
            .await;
        fx.store
            .enqueue(NewOperation::new(
                OperationKind::UploadImage,
                entry.id.clone(),
                json!({"path": photo_path}),
            ))
            .await
            .unwrap();

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/inspection-photos");
                then.status(201)
                    .json_body(json!({"url": "https://cdn.example.com/p.jpg"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(inspection_json("ins_1", 2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200).json_body(json!([]));
            })
            .await;

        let outcome = fx.service.sync_all(false).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.uploaded, 1);

        let image = fx.store.image(&photo_path).await.unwrap();
        assert!(image.is_uploaded());
        assert_eq!(
            image.server_url.as_deref(),
            Some("https://cdn.example.com/p.jpg")
        );

        let entry = fx.store.entry(&RecordId::from("ent_55")).await.unwrap();
        assert_eq!(entry.photos, vec!["https://cdn.example.com/p.jpg".to_string()]);
        assert_eq!(entry.sync_status, SyncStatus::Pending);

        // The rewritten entry is queued for the next cycle
        let kinds: Vec<OperationKind> = fx
            .store
            .pending_operations()
            .await
            .into_iter()
            .map(|operation| operation.kind)
            .collect();
        assert_eq!(kinds, vec![OperationKind::UpdateEntry]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_automatic_attempts_are_throttled() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |settings| {
            settings.sync_throttle = Duration::from_secs(60);
        })
        .await;
        fx.store.save_inspection(&inspection("ins_1")).await;

        let pull = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(inspection_json("ins_1", 2000));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200).json_body(json!([]));
            })
            .await;

        fx.service.sync_all(false).await.unwrap();
        pull.assert_hits_async(1).await;

        // Within the throttle window an automatic attempt does nothing
        let throttled = fx.service.sync_all(false).await.unwrap();
        assert!(throttled.success);
        assert_eq!(throttled.downloaded, 0);
        pull.assert_hits_async(1).await;

        // A manual trigger bypasses the throttle
        fx.service.trigger_sync().await.unwrap();
        pull.assert_hits_async(2).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_completion_marks_inspection_synced() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server.base_url(), |_| {}).await;

        let mut completed = inspection("ins_1");
        completed.status = InspectionStatus::Completed;
        completed.sync_status = SyncStatus::Pending;
        fx.store.save_inspection(&completed).await;
        fx.store
            .enqueue(NewOperation::new(
                OperationKind::CompleteInspection,
                RecordId::from("ins_1"),
                json!({"status": "completed"}),
            ))
            .await
            .unwrap();

        let patch = server
            .mock_async(|when, then| {
                when.method(PATCH).path("/api/inspections/ins_1/status");
                then.status(200).json_body(json!({}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1");
                then.status(200).json_body(json!({
                    "id": "ins_1",
                    "ownerId": "acct_1",
                    "targetRef": "unit-7",
                    "template": {"name": "Routine", "sections": []},
                    "status": "completed",
                    "createdAt": 1000,
                    "updatedAt": completed.updated_at,
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/inspections/ins_1/entries");
                then.status(200).json_body(json!([]));
            })
            .await;

        let outcome = fx.service.sync_all(false).await.unwrap();
        assert_eq!(outcome.uploaded, 1);
        patch.assert_hits_async(1).await;

        let inspection = fx
            .store
            .inspection(&RecordId::from("ins_1"), None)
            .await
            .unwrap();
        assert_eq!(inspection.sync_status, SyncStatus::Synced);
    }
}
