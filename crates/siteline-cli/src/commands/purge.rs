use std::path::Path;

use siteline_core::{ImageStore, LocalStore};

use crate::commands::common::{open_store, require_settings, IMAGES_DIR};
use crate::error::CliError;

pub async fn run_purge(images_older_than: Option<u32>, data_dir: &Path) -> Result<(), CliError> {
    let settings = require_settings()?;
    let store = open_store(data_dir).await;
    let retention_days = images_older_than.unwrap_or(settings.image_retention_days);

    let (purged, cleaned) =
        purge_local_data(&store, &settings.account_id, data_dir, retention_days).await;

    println!("Removed {purged} records from other accounts");
    println!("Cleaned up {cleaned} uploaded photo files");
    Ok(())
}

pub async fn purge_local_data(
    store: &LocalStore,
    owner_id: &str,
    data_dir: &Path,
    retention_days: u32,
) -> (u64, u64) {
    let purged = store.purge_not_owned(owner_id).await;
    let images = ImageStore::new(data_dir.join(IMAGES_DIR), store.clone());
    let cleaned = images.cleanup_older_than(retention_days).await;
    (purged, cleaned)
}
