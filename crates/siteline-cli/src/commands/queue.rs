use std::path::Path;

use crate::commands::common::{format_queue_lines, open_store, queue_to_item, QueueItem};
use crate::error::CliError;

pub async fn run_queue(as_json: bool, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir).await;
    let operations = store.pending_operations().await;

    if as_json {
        let items = operations
            .iter()
            .map(queue_to_item)
            .collect::<Vec<QueueItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&operations) {
        println!("{line}");
    }
    Ok(())
}
