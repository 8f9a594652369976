//! Local image repository implementation

use crate::error::Result;
use crate::models::{ImageStatus, LocalImage, RecordId};
use libsql::Connection;

const IMAGE_COLUMNS: &str = "local_path, server_url, status, inspection_id, entry_id, created_at";

/// Trait for local image metadata operations (async)
#[allow(async_fn_in_trait)]
pub trait ImageRepository {
    /// Insert or refresh an image row keyed by local path
    async fn save(&self, image: &LocalImage) -> Result<()>;

    /// Get an image by its local path
    async fn get(&self, local_path: &str) -> Result<Option<LocalImage>>;

    /// Move an image through its upload lifecycle
    async fn set_status(&self, local_path: &str, status: ImageStatus) -> Result<()>;

    /// Record the durable server URL and mark the image uploaded
    async fn promote(&self, local_path: &str, server_url: &str) -> Result<()>;

    /// All tracked images, newest first
    async fn list(&self) -> Result<Vec<LocalImage>>;

    /// Images currently in the given status, oldest first
    async fn with_status(&self, status: ImageStatus) -> Result<Vec<LocalImage>>;

    /// Uploaded images captured before the cutoff, oldest first
    async fn uploaded_before(&self, cutoff_ms: i64) -> Result<Vec<LocalImage>>;

    /// Delete an image row
    async fn remove(&self, local_path: &str) -> Result<()>;

    /// Re-point image rows at a new entry id; returns rows changed
    async fn retarget_entry(&self, old_entry: &RecordId, new_entry: &RecordId) -> Result<u64>;
}

/// libSQL implementation of `ImageRepository`
pub struct LibSqlImageRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlImageRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_image(row: &libsql::Row) -> Result<LocalImage> {
        let status: String = row.get(2)?;
        Ok(LocalImage {
            local_path: row.get(0)?,
            server_url: row.get(1)?,
            status: status.parse()?,
            inspection_id: RecordId::from(row.get::<String>(3)?),
            entry_id: row.get::<Option<String>>(4)?.map(RecordId::from),
            created_at: row.get(5)?,
        })
    }
}

impl ImageRepository for LibSqlImageRepository<'_> {
    async fn save(&self, image: &LocalImage) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO local_images (local_path, server_url, status,
                     inspection_id, entry_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    image.local_path.as_str(),
                    image.server_url.clone(),
                    image.status.as_str(),
                    image.inspection_id.as_str(),
                    image.entry_id.as_ref().map(ToString::to_string),
                    image.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, local_path: &str) -> Result<Option<LocalImage>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {IMAGE_COLUMNS} FROM local_images WHERE local_path = ?"),
                [local_path],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_image(&row)?)),
            None => Ok(None),
        }
    }

    async fn set_status(&self, local_path: &str, status: ImageStatus) -> Result<()> {
        self.conn
            .execute(
                "UPDATE local_images SET status = ? WHERE local_path = ?",
                [status.as_str(), local_path],
            )
            .await?;
        Ok(())
    }

    async fn promote(&self, local_path: &str, server_url: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE local_images SET status = 'uploaded', server_url = ?
                 WHERE local_path = ?",
                [server_url, local_path],
            )
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LocalImage>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {IMAGE_COLUMNS} FROM local_images ORDER BY created_at DESC"),
                (),
            )
            .await?;

        let mut images = Vec::new();
        while let Some(row) = rows.next().await? {
            images.push(Self::parse_image(&row)?);
        }
        Ok(images)
    }

    async fn with_status(&self, status: ImageStatus) -> Result<Vec<LocalImage>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {IMAGE_COLUMNS} FROM local_images
                     WHERE status = ? ORDER BY created_at ASC"
                ),
                [status.as_str()],
            )
            .await?;

        let mut images = Vec::new();
        while let Some(row) = rows.next().await? {
            images.push(Self::parse_image(&row)?);
        }
        Ok(images)
    }

    async fn uploaded_before(&self, cutoff_ms: i64) -> Result<Vec<LocalImage>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {IMAGE_COLUMNS} FROM local_images
                     WHERE status = 'uploaded' AND created_at < ?
                     ORDER BY created_at ASC"
                ),
                [cutoff_ms],
            )
            .await?;

        let mut images = Vec::new();
        while let Some(row) = rows.next().await? {
            images.push(Self::parse_image(&row)?);
        }
        Ok(images)
    }

    async fn remove(&self, local_path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_images WHERE local_path = ?", [local_path])
            .await?;
        Ok(())
    }

    async fn retarget_entry(&self, old_entry: &RecordId, new_entry: &RecordId) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "UPDATE local_images SET entry_id = ? WHERE entry_id = ?",
                [new_entry.as_str(), old_entry.as_str()],
            )
            .await?;
        Ok(affected)
    }
}
