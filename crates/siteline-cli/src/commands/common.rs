use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use siteline_core::api::ApiClient;
use siteline_core::models::{LocalImage, QueuedOperation, ResolvedConflict};
use siteline_core::{ConnectivityMonitor, ImageStore, LocalStore, SyncService, SyncSettings};

use crate::error::CliError;

pub const DB_FILE: &str = "siteline.db";
pub const IMAGES_DIR: &str = "images";

#[derive(Debug, Serialize)]
pub struct QueueItem {
    pub id: i64,
    pub operation: String,
    pub target_id: String,
    pub priority: i64,
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub age: String,
}

#[derive(Debug, Serialize)]
pub struct ConflictItem {
    pub id: i64,
    pub entity_kind: String,
    pub entity_id: String,
    pub local_updated_at: i64,
    pub server_updated_at: i64,
    pub winner: String,
    pub strategy: String,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
}

#[derive(Debug, Serialize)]
pub struct ImageItem {
    pub local_path: String,
    pub status: String,
    pub server_url: Option<String>,
    pub inspection_id: String,
    pub entry_id: Option<String>,
    pub created_at: i64,
    pub age: String,
}

pub fn resolve_data_dir(cli_dir: Option<PathBuf>) -> PathBuf {
    cli_dir
        .or_else(|| env::var_os("SITELINE_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("siteline")
}

pub async fn open_store(data_dir: &Path) -> LocalStore {
    LocalStore::open(data_dir.join(DB_FILE)).await
}

pub fn require_settings() -> Result<SyncSettings, CliError> {
    SyncSettings::from_env()?.ok_or(CliError::NotConfigured)
}

pub fn build_service(
    settings: &SyncSettings,
    store: LocalStore,
    data_dir: &Path,
) -> Result<(SyncService, ConnectivityMonitor), CliError> {
    let images = ImageStore::new(data_dir.join(IMAGES_DIR), store.clone());
    let api = ApiClient::new(settings)?;
    let monitor = ConnectivityMonitor::new(settings)?;
    let service = SyncService::new(store, images, api, monitor.clone(), settings.clone());
    tracing::info!("Sync service ready for {}", settings.base_url);
    Ok((service, monitor))
}

pub fn queue_to_item(operation: &QueuedOperation) -> QueueItem {
    let now_ms = Utc::now().timestamp_millis();
    QueueItem {
        id: operation.id,
        operation: operation.kind.as_str().to_string(),
        target_id: operation.target_id.as_str().to_string(),
        priority: operation.priority,
        retry_count: operation.retry_count,
        last_error: operation.last_error.clone(),
        created_at: operation.created_at,
        age: format_relative_time(operation.created_at, now_ms),
    }
}

pub fn conflict_to_item(conflict: &ResolvedConflict) -> ConflictItem {
    ConflictItem {
        id: conflict.id,
        entity_kind: conflict.entity_kind.clone(),
        entity_id: conflict.entity_id.clone(),
        local_updated_at: conflict.local_updated_at,
        server_updated_at: conflict.server_updated_at,
        winner: conflict.winner.clone(),
        strategy: conflict.strategy.clone(),
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
    }
}

pub fn image_to_item(image: &LocalImage) -> ImageItem {
    let now_ms = Utc::now().timestamp_millis();
    ImageItem {
        local_path: image.local_path.clone(),
        status: image.status.as_str().to_string(),
        server_url: image.server_url.clone(),
        inspection_id: image.inspection_id.as_str().to_string(),
        entry_id: image.entry_id.as_ref().map(ToString::to_string),
        created_at: image.created_at,
        age: format_relative_time(image.created_at, now_ms),
    }
}

pub fn format_queue_lines(operations: &[QueuedOperation]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    operations
        .iter()
        .map(|operation| {
            let age = format_relative_time(operation.created_at, now_ms);
            let mut line = format!(
                "{:<5} {:<20} {:<26} retries={}  {age}",
                operation.id,
                operation.kind.as_str(),
                operation.target_id.as_str(),
                operation.retry_count
            );
            if let Some(last_error) = &operation.last_error {
                line.push_str("  last_error=");
                line.push_str(last_error);
            }
            line
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[ResolvedConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<14}  {}={}  winner={} local={} server={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.entity_kind,
                conflict.entity_id,
                conflict.winner,
                conflict.local_updated_at,
                conflict.server_updated_at
            )
        })
        .collect()
}

pub fn format_image_lines(images: &[LocalImage]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    images
        .iter()
        .map(|image| {
            let age = format_relative_time(image.created_at, now_ms);
            format!(
                "{:<9}  {:<44}  {:<10}  {}",
                image.status.as_str(),
                compact_path(&image.local_path, 44),
                age,
                image.server_url.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

/// Truncate a long path from the left, keeping the distinctive tail.
pub fn compact_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars {
        return path.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let tail: String = path.chars().skip(count - keep).collect();
    format!("...{tail}")
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
