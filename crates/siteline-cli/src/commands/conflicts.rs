use std::path::Path;

use crate::commands::common::{conflict_to_item, format_conflict_lines, open_store, ConflictItem};
use crate::error::CliError;

pub async fn run_conflicts(limit: usize, as_json: bool, data_dir: &Path) -> Result<(), CliError> {
    let store = open_store(data_dir).await;
    let conflicts = store.recent_conflicts(limit).await;

    if as_json {
        let items = conflicts
            .iter()
            .map(conflict_to_item)
            .collect::<Vec<ConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
