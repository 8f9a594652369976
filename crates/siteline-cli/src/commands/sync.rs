use std::path::Path;

use crate::commands::common::{build_service, open_store, require_settings};
use crate::error::CliError;

pub async fn run_sync(data_dir: &Path) -> Result<(), CliError> {
    let settings = require_settings()?;
    let store = open_store(data_dir).await;
    let (service, monitor) = build_service(&settings, store, data_dir)?;

    service.on_drop(|operation| {
        eprintln!(
            "Abandoned {} for {} after repeated failures",
            operation.kind.as_str(),
            operation.target_id.as_str()
        );
    });

    // The monitor starts out offline; one probe settles the real state
    monitor.probe_now().await;
    let outcome = service.trigger_sync().await?;

    println!(
        "Sync finished: {} uploaded, {} downloaded, {} failed",
        outcome.uploaded, outcome.downloaded, outcome.failed
    );
    Ok(())
}
