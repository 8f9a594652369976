use std::path::Path;

use siteline_core::connectivity::DEFAULT_PROBE_INTERVAL;
use siteline_core::BackgroundSync;

use crate::commands::common::{build_service, open_store, require_settings};
use crate::error::CliError;

pub async fn run_watch(data_dir: &Path) -> Result<(), CliError> {
    let settings = require_settings()?;
    let sync_interval = settings.sync_interval;
    let store = open_store(data_dir).await;
    let (service, monitor) = build_service(&settings, store, data_dir)?;

    service.on_drop(|operation| {
        eprintln!(
            "Abandoned {} for {} after repeated failures",
            operation.kind.as_str(),
            operation.target_id.as_str()
        );
    });

    let probe = monitor.start(DEFAULT_PROBE_INTERVAL);
    let background = BackgroundSync::spawn(service, &monitor, sync_interval);
    println!("Watching for changes (Ctrl-C to stop)");

    tokio::signal::ctrl_c().await?;

    background.shutdown().await;
    probe.abort();
    println!("Stopped");
    Ok(())
}
