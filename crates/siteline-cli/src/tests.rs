use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use siteline_core::models::{
    ImageStatus, Inspection, LocalImage, OperationKind, QueuedOperation, ResolvedConflict,
    TemplateSnapshot,
};
use siteline_core::{LocalStore, RecordId};
use tempfile::tempdir;

use crate::cli::{CompletionShell, ImageStatusArg};
use crate::commands::common::{
    compact_path, format_conflict_lines, format_image_lines, format_queue_lines,
    format_relative_time, format_sync_timestamp, open_store, queue_to_item, resolve_data_dir,
};
use crate::commands::completions::run_completions;
use crate::commands::images::run_images;
use crate::commands::purge::purge_local_data;
use crate::commands::status::{format_status_lines, gather_status};

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn format_sync_timestamp_renders_utc() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn compact_path_keeps_the_tail() {
    assert_eq!(compact_path("/short/a.jpg", 20), "/short/a.jpg");
    assert_eq!(
        compact_path("/very/long/data/dir/images/ins-1/photo.jpg", 20),
        "...s/ins-1/photo.jpg"
    );
}

#[test]
fn resolve_data_dir_prefers_cli_override() {
    let override_dir = PathBuf::from("/tmp/siteline-cli-test-data");
    assert_eq!(resolve_data_dir(Some(override_dir.clone())), override_dir);
}

#[test]
fn image_status_arg_maps_to_core_status() {
    assert_eq!(
        ImageStatus::from(ImageStatusArg::Pending),
        ImageStatus::Pending
    );
    assert_eq!(
        ImageStatus::from(ImageStatusArg::Uploaded),
        ImageStatus::Uploaded
    );
}

#[test]
fn queue_lines_include_kind_retries_and_error() {
    let now_ms = Utc::now().timestamp_millis();
    let operation = QueuedOperation {
        id: 7,
        kind: OperationKind::CreateEntry,
        target_id: RecordId::from("local-0198f2ab"),
        payload: json!({}),
        priority: 10,
        retry_count: 2,
        last_error: Some("API error (500): database locked".to_string()),
        created_at: now_ms - 120_000,
    };

    let lines = format_queue_lines(&[operation.clone()]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("create_entry"));
    assert!(lines[0].contains("retries=2"));
    assert!(lines[0].contains("2m ago"));
    assert!(lines[0].contains("last_error=API error (500)"));

    let item = queue_to_item(&operation);
    assert_eq!(item.operation, "create_entry");
    assert_eq!(item.target_id, "local-0198f2ab");
    assert_eq!(item.age, "2m ago");
}

#[test]
fn conflict_lines_show_strategy_and_winner() {
    let conflict = ResolvedConflict {
        id: 3,
        entity_kind: "entry".to_string(),
        entity_id: "ent_55".to_string(),
        local_updated_at: 5_000,
        server_updated_at: 5_000,
        winner: "merged".to_string(),
        strategy: "field-merge".to_string(),
        resolved_at: 0,
    };

    let lines = format_conflict_lines(&[conflict]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("1970-01-01 00:00:00 UTC"));
    assert!(lines[0].contains("field-merge"));
    assert!(lines[0].contains("entry=ent_55"));
    assert!(lines[0].contains("winner=merged"));
}

#[test]
fn image_lines_show_status_and_url() {
    let mut uploaded = LocalImage::new("/data/img/a.jpg", RecordId::from("ins_1"), None);
    uploaded.status = ImageStatus::Uploaded;
    uploaded.server_url = Some("https://cdn.example.com/a.jpg".to_string());
    let pending = LocalImage::new("/data/img/b.jpg", RecordId::from("ins_1"), None);

    let lines = format_image_lines(&[uploaded, pending]);
    assert!(lines[0].starts_with("uploaded"));
    assert!(lines[0].ends_with("https://cdn.example.com/a.jpg"));
    assert!(lines[1].starts_with("pending"));
    assert!(lines[1].ends_with("-"));
}

#[tokio::test(flavor = "multi_thread")]
async fn gather_status_reports_unconfigured_empty_store() {
    let store = LocalStore::in_memory().await.unwrap();
    let report = gather_status(&store, None, None).await;

    assert!(!report.configured);
    assert!(!report.store_degraded);
    assert_eq!(report.inspections, 0);
    assert_eq!(report.queue_depth, 0);

    let lines = format_status_lines(&report);
    assert_eq!(lines[0], "server:       not configured");
    assert!(lines.iter().any(|line| line == "local store:  ok"));
}

#[tokio::test(flavor = "multi_thread")]
async fn purge_local_data_drops_foreign_records_and_stale_files() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path()).await;

    let template = TemplateSnapshot {
        name: "Routine".to_string(),
        sections: Vec::new(),
    };
    store
        .save_inspection(&Inspection::new(
            RecordId::from("ins_mine"),
            "acct_1",
            "unit-1",
            template.clone(),
        ))
        .await;
    store
        .save_inspection(&Inspection::new(
            RecordId::from("ins_other"),
            "acct_2",
            "unit-2",
            template,
        ))
        .await;

    let stale = dir.path().join("stale.jpg");
    std::fs::write(&stale, b"jpeg").unwrap();
    let stale_path = stale.to_str().unwrap().to_string();
    let mut image = LocalImage::new(stale_path.clone(), RecordId::from("ins_mine"), None);
    image.created_at = Utc::now().timestamp_millis() - 8 * 86_400_000;
    store.save_image(&image).await;
    store
        .promote_image(&stale_path, "https://cdn.example.com/stale.jpg")
        .await;

    let (purged, cleaned) = purge_local_data(&store, "acct_1", dir.path(), 7).await;

    assert_eq!(purged, 1);
    assert_eq!(cleaned, 1);
    assert!(!stale.exists());
    assert!(store
        .inspection(&RecordId::from("ins_other"), None)
        .await
        .is_none());
    assert!(store
        .inspection(&RecordId::from("ins_mine"), None)
        .await
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_images_handles_empty_store() {
    let dir = tempdir().unwrap();
    run_images(None, false, dir.path()).await.unwrap();
    run_images(Some(ImageStatusArg::Pending), true, dir.path())
        .await
        .unwrap();
}

#[test]
fn run_completions_writes_bash_script_file() {
    let output_path = std::env::temp_dir().join(format!(
        "siteline-completions-test-{}.bash",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos())
    ));

    run_completions(CompletionShell::Bash, Some(output_path.as_path())).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("_siteline()"));
    assert!(script.contains("complete -F _siteline"));

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn run_completions_emits_zsh_compdef_header() {
    let output_path = std::env::temp_dir().join(format!(
        "siteline-completions-test-{}.zsh",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos())
    ));

    run_completions(CompletionShell::Zsh, Some(output_path.as_path())).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.starts_with("#compdef siteline"));

    let _ = std::fs::remove_file(output_path);
}
