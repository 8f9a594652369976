use std::path::Path;

use serde::Serialize;
use siteline_core::models::ImageStatus;
use siteline_core::{ConnectionState, ConnectivityMonitor, LocalStore, SyncSettings};

use crate::commands::common::open_store;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub configured: bool,
    pub base_url: Option<String>,
    pub account_id: Option<String>,
    pub connection: Option<String>,
    pub store_degraded: bool,
    pub inspections: usize,
    pub queue_depth: u64,
    pub pending_images: usize,
    pub failed_images: usize,
}

pub async fn run_status(as_json: bool, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir).await;
    let settings = SyncSettings::from_env()?;

    let connection = match &settings {
        Some(settings) => {
            let monitor = ConnectivityMonitor::new(settings)?;
            Some(monitor.probe_now().await)
        }
        None => None,
    };

    let report = gather_status(&store, settings.as_ref(), connection).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in format_status_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

pub async fn gather_status(
    store: &LocalStore,
    settings: Option<&SyncSettings>,
    connection: Option<ConnectionState>,
) -> StatusReport {
    StatusReport {
        configured: settings.is_some(),
        base_url: settings.map(|settings| settings.base_url.clone()),
        account_id: settings.map(|settings| settings.account_id.clone()),
        connection: connection.map(|state| state.as_str().to_string()),
        store_degraded: store.is_degraded(),
        inspections: store.inspection_ids().await.len(),
        queue_depth: store.queue_depth().await,
        pending_images: store.images_with_status(ImageStatus::Pending).await.len(),
        failed_images: store.images_with_status(ImageStatus::Failed).await.len(),
    }
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let mut lines = Vec::new();

    if report.configured {
        lines.push(format!(
            "server:       {} (account {})",
            report.base_url.as_deref().unwrap_or("-"),
            report.account_id.as_deref().unwrap_or("-")
        ));
        lines.push(format!(
            "connection:   {}",
            report.connection.as_deref().unwrap_or("unknown")
        ));
    } else {
        lines.push("server:       not configured".to_string());
    }

    let store_state = if report.store_degraded {
        "degraded (online-only mode)"
    } else {
        "ok"
    };
    lines.push(format!("local store:  {store_state}"));
    lines.push(format!("inspections:  {}", report.inspections));
    lines.push(format!("queued ops:   {}", report.queue_depth));
    lines.push(format!(
        "photos:       {} pending, {} failed",
        report.pending_images, report.failed_images
    ));
    lines
}
