use std::path::Path;

use crate::cli::ImageStatusArg;
use crate::commands::common::{format_image_lines, image_to_item, open_store, ImageItem};
use crate::error::CliError;

pub async fn run_images(
    status: Option<ImageStatusArg>,
    as_json: bool,
    data_dir: &Path,
) -> Result<(), CliError> {
    let store = open_store(data_dir).await;
    let images = match status {
        Some(status) => store.images_with_status(status.into()).await,
        None => store.images().await,
    };

    if as_json {
        let items = images.iter().map(image_to_item).collect::<Vec<ImageItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if images.is_empty() {
        println!("No photos tracked.");
        return Ok(());
    }

    for line in format_image_lines(&images) {
        println!("{line}");
    }
    Ok(())
}
