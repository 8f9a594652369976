//! Managed image directory and upload bookkeeping.
//!
//! Captured photos are copied into a directory the app owns, named so they
//! never collide, and tracked through [`LocalImage`] rows until the server
//! holds a durable copy. Entry photo lists reference images by local path
//! first and by server URL after upload.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{ImageStatus, LocalImage, RecordId};
use crate::store::LocalStore;
use crate::util::{is_http_url, sanitize_file_name, sanitize_token};

const MS_PER_DAY: i64 = 86_400_000;

/// Filesystem half of photo capture; metadata lives in [`LocalStore`].
#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
    store: LocalStore,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, store: LocalStore) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    /// Managed directory images are copied into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when the value names a device file rather than a server URL.
    #[must_use]
    pub fn is_local_path(value: &str) -> bool {
        !is_http_url(value)
    }

    /// Copy a captured photo into the managed directory and record it as
    /// pending upload.
    ///
    /// The source file is left in place; callers own its lifecycle. The
    /// returned record's `local_path` is the identity used in entry photo
    /// lists and the upload queue.
    pub async fn store_locally(
        &self,
        source: &Path,
        inspection_id: &RecordId,
        entry_id: Option<RecordId>,
    ) -> Result<LocalImage> {
        let destination = self.build_managed_path(inspection_id, source)?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| storage_error("create_dir", parent, &error))?;
        }
        tokio::fs::copy(source, &destination)
            .await
            .map_err(|error| storage_error("copy", source, &error))?;

        let image = LocalImage::new(
            destination.to_string_lossy().into_owned(),
            inspection_id.clone(),
            entry_id,
        );
        self.store.save_image(&image).await;

        Ok(image)
    }

    /// Record the durable server URL once an upload completed.
    pub async fn promote_to_server_url(&self, local_path: &str, server_url: &str) {
        self.store.promote_image(local_path, server_url).await;
    }

    /// Flag an image as being uploaded right now.
    pub async fn mark_uploading(&self, local_path: &str) {
        self.store
            .set_image_status(local_path, ImageStatus::Uploading)
            .await;
    }

    /// Return an image to the retryable failed state.
    pub async fn mark_failed(&self, local_path: &str) {
        self.store
            .set_image_status(local_path, ImageStatus::Failed)
            .await;
    }

    /// Images captured but not yet uploaded.
    pub async fn pending_images(&self) -> Vec<LocalImage> {
        self.store.images_with_status(ImageStatus::Pending).await
    }

    /// Delete local copies of images that were uploaded more than `days`
    /// days ago. Images without a durable server copy are never touched.
    ///
    /// Returns the number of images removed.
    pub async fn cleanup_older_than(&self, days: u32) -> u64 {
        let cutoff = Utc::now().timestamp_millis() - i64::from(days) * MS_PER_DAY;
        let mut removed = 0;

        for image in self.store.images_uploaded_before(cutoff).await {
            if image.server_url.is_none() {
                continue;
            }

            match tokio::fs::remove_file(&image.local_path).await {
                Ok(()) => {}
                // Already gone locally; still drop the stale row
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    tracing::warn!(path = %image.local_path, %error, "Image cleanup failed");
                    continue;
                }
            }

            self.store.remove_image(&image.local_path).await;
            removed += 1;
        }

        if removed > 0 {
            tracing::info!(removed, "Removed local copies of uploaded images");
        }
        removed
    }

    fn build_managed_path(&self, inspection_id: &RecordId, source: &Path) -> Result<PathBuf> {
        let folder = sanitize_token(inspection_id.as_str());
        if folder.is_empty() {
            return Err(Error::InvalidInput(
                "Image inspection_id cannot be empty".to_string(),
            ));
        }

        let original = source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("photo");
        let file_name = sanitize_file_name(original);
        let ts = Utc::now().timestamp_millis();
        let id = Uuid::now_v7();

        Ok(self.root.join(folder).join(format!("{ts}-{id}-{file_name}")))
    }
}

fn storage_error(operation: &str, path: &Path, error: &std::io::Error) -> Error {
    Error::Storage(format!(
        "Image {operation} failed for {}: {error}",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Inspection, TemplateSnapshot};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    async fn image_store(root: &Path) -> ImageStore {
        let store = LocalStore::in_memory().await.unwrap();
        let inspection = Inspection::new(
            RecordId::from("ins_1"),
            "acct_1",
            "unit-3",
            TemplateSnapshot {
                name: "Routine".to_string(),
                sections: Vec::new(),
            },
        );
        store.save_inspection(&inspection).await;
        ImageStore::new(root, store)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_store_locally_copies_and_records_pending() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("My Photo (1).JPG");
        std::fs::write(&source, b"jpeg bytes").unwrap();

        let root = tmp.path().join("managed");
        let images = image_store(&root).await;

        let image = images
            .store_locally(&source, &RecordId::from("ins_1"), None)
            .await
            .unwrap();

        assert!(image.local_path.starts_with(root.join("ins-1").to_str().unwrap()));
        assert!(image.local_path.ends_with("-my-photo-1.jpg"));
        assert_eq!(std::fs::read(&image.local_path).unwrap(), b"jpeg bytes");
        assert!(source.exists());

        let recorded = images.store.image(&image.local_path).await.unwrap();
        assert_eq!(recorded.status, ImageStatus::Pending);
        assert_eq!(recorded.server_url, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_store_locally_rejects_blank_inspection_id() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("a.jpg");
        std::fs::write(&source, b"x").unwrap();

        let images = image_store(&tmp.path().join("managed")).await;
        let err = images
            .store_locally(&source, &RecordId::from("  "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cleanup_spares_images_without_server_copy() {
        let tmp = tempdir().unwrap();
        let images = image_store(tmp.path()).await;

        let old_uploaded = tmp.path().join("uploaded.jpg");
        let still_pending = tmp.path().join("pending.jpg");
        std::fs::write(&old_uploaded, b"old").unwrap();
        std::fs::write(&still_pending, b"new").unwrap();

        let eight_days_ago = Utc::now().timestamp_millis() - 8 * MS_PER_DAY;
        let mut uploaded = LocalImage::new(
            old_uploaded.to_str().unwrap(),
            RecordId::from("ins_1"),
            None,
        );
        uploaded.created_at = eight_days_ago;
        images.store.save_image(&uploaded).await;
        images
            .promote_to_server_url(&uploaded.local_path, "https://cdn.example.com/a.jpg")
            .await;

        let mut pending = LocalImage::new(
            still_pending.to_str().unwrap(),
            RecordId::from("ins_1"),
            None,
        );
        pending.created_at = eight_days_ago;
        images.store.save_image(&pending).await;

        assert_eq!(images.cleanup_older_than(7).await, 1);
        assert!(!old_uploaded.exists());
        assert!(still_pending.exists());
        assert!(images.store.image(pending.local_path.as_str()).await.is_some());
        assert!(images.store.image(uploaded.local_path.as_str()).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_recent_uploads_survive_cleanup() {
        let tmp = tempdir().unwrap();
        let images = image_store(tmp.path()).await;

        let fresh = tmp.path().join("fresh.jpg");
        std::fs::write(&fresh, b"fresh").unwrap();

        let image = LocalImage::new(fresh.to_str().unwrap(), RecordId::from("ins_1"), None);
        images.store.save_image(&image).await;
        images
            .promote_to_server_url(&image.local_path, "https://cdn.example.com/f.jpg")
            .await;

        assert_eq!(images.cleanup_older_than(7).await, 0);
        assert!(fresh.exists());
    }

    #[test]
    fn test_is_local_path() {
        assert!(ImageStore::is_local_path("/data/images/a.jpg"));
        assert!(ImageStore::is_local_path("file:///data/images/a.jpg"));
        assert!(!ImageStore::is_local_path("https://cdn.example.com/a.jpg"));
        assert!(!ImageStore::is_local_path("http://localhost:3000/a.jpg"));
    }
}
