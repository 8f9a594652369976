//! Inspection repository implementation

use crate::error::{Error, Result};
use crate::models::{Inspection, InspectionStatus, RecordId, SyncStatus};
use libsql::Connection;

const INSPECTION_COLUMNS: &str = "id, owner_id, target_ref, template, status,
     created_at, updated_at, sync_status, is_deleted";

/// Trait for inspection storage operations (async)
#[allow(async_fn_in_trait)]
pub trait InspectionRepository {
    /// Insert or update an inspection by primary key
    async fn save(&self, inspection: &Inspection) -> Result<()>;

    /// Get an inspection by id, optionally scoped to an owner account
    async fn get(&self, id: &RecordId, owner_scope: Option<&str>) -> Result<Option<Inspection>>;

    /// List inspections for an owner, most recently updated first
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Inspection>>;

    /// Identifiers of every non-deleted inspection
    async fn ids(&self) -> Result<Vec<RecordId>>;

    /// Update lifecycle and sync status together
    async fn set_status(
        &self,
        id: &RecordId,
        status: InspectionStatus,
        sync_status: SyncStatus,
    ) -> Result<()>;

    /// Update sync status only
    async fn set_sync_status(&self, id: &RecordId, sync_status: SyncStatus) -> Result<()>;

    /// Delete every inspection not owned by the given account, along with
    /// its entries, images, and queued operations. Returns the number of
    /// inspections removed.
    async fn purge_not_owned(&self, owner_id: &str) -> Result<u64>;
}

/// libSQL implementation of `InspectionRepository`
pub struct LibSqlInspectionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlInspectionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_inspection(row: &libsql::Row) -> Result<Inspection> {
        let status: String = row.get(4)?;
        let sync_status: String = row.get(7)?;
        Ok(Inspection {
            id: RecordId::from(row.get::<String>(0)?),
            owner_id: row.get(1)?,
            target_ref: row.get(2)?,
            template: serde_json::from_str(&row.get::<String>(3)?)?,
            status: status.parse()?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            sync_status: sync_status.parse()?,
            is_deleted: row.get::<i32>(8)? != 0,
        })
    }
}

impl InspectionRepository for LibSqlInspectionRepository<'_> {
    async fn save(&self, inspection: &Inspection) -> Result<()> {
        let template = serde_json::to_string(&inspection.template)?;

        // ON CONFLICT DO UPDATE rather than INSERT OR REPLACE: a replace is
        // delete-then-insert, and the delete would cascade away entries and
        // images of an inspection being refreshed from the server.
        self.conn
            .execute(
                "INSERT INTO inspections (id, owner_id, target_ref, template, status,
                     created_at, updated_at, sync_status, is_deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     owner_id = excluded.owner_id,
                     target_ref = excluded.target_ref,
                     template = excluded.template,
                     status = excluded.status,
                     created_at = excluded.created_at,
                     updated_at = excluded.updated_at,
                     sync_status = excluded.sync_status,
                     is_deleted = excluded.is_deleted",
                libsql::params![
                    inspection.id.as_str(),
                    inspection.owner_id.as_str(),
                    inspection.target_ref.as_str(),
                    template,
                    inspection.status.as_str(),
                    inspection.created_at,
                    inspection.updated_at,
                    inspection.sync_status.as_str(),
                    i64::from(inspection.is_deleted),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &RecordId, owner_scope: Option<&str>) -> Result<Option<Inspection>> {
        let mut rows = if let Some(owner_id) = owner_scope {
            self.conn
                .query(
                    &format!(
                        "SELECT {INSPECTION_COLUMNS} FROM inspections
                         WHERE id = ? AND owner_id = ? AND is_deleted = 0"
                    ),
                    [id.as_str(), owner_id],
                )
                .await?
        } else {
            self.conn
                .query(
                    &format!(
                        "SELECT {INSPECTION_COLUMNS} FROM inspections
                         WHERE id = ? AND is_deleted = 0"
                    ),
                    [id.as_str()],
                )
                .await?
        };

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_inspection(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Inspection>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {INSPECTION_COLUMNS} FROM inspections
                     WHERE owner_id = ? AND is_deleted = 0
                     ORDER BY updated_at DESC"
                ),
                [owner_id],
            )
            .await?;

        let mut inspections = Vec::new();
        while let Some(row) = rows.next().await? {
            inspections.push(Self::parse_inspection(&row)?);
        }
        Ok(inspections)
    }

    async fn ids(&self) -> Result<Vec<RecordId>> {
        let mut rows = self
            .conn
            .query("SELECT id FROM inspections WHERE is_deleted = 0", ())
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(RecordId::from(row.get::<String>(0)?));
        }
        Ok(ids)
    }

    async fn set_status(
        &self,
        id: &RecordId,
        status: InspectionStatus,
        sync_status: SyncStatus,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let affected = self
            .conn
            .execute(
                "UPDATE inspections SET status = ?, sync_status = ?, updated_at = ?
                 WHERE id = ?",
                libsql::params![status.as_str(), sync_status.as_str(), now, id.as_str()],
            )
            .await?;

        if affected == 0 {
            return Err(Error::NotFound(format!("Inspection {id}")));
        }
        Ok(())
    }

    async fn set_sync_status(&self, id: &RecordId, sync_status: SyncStatus) -> Result<()> {
        self.conn
            .execute(
                "UPDATE inspections SET sync_status = ? WHERE id = ?",
                [sync_status.as_str(), id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn purge_not_owned(&self, owner_id: &str) -> Result<u64> {
        // Queue rows first: their targets span inspections, entries, and
        // image paths, none of which survive the inspection delete.
        self.conn
            .execute(
                "DELETE FROM sync_queue WHERE
                     target_id IN (SELECT id FROM inspections WHERE owner_id != ?1)
                  OR target_id IN (SELECT id FROM inspection_entries WHERE inspection_id IN
                         (SELECT id FROM inspections WHERE owner_id != ?1))
                  OR target_id IN (SELECT local_path FROM local_images WHERE inspection_id IN
                         (SELECT id FROM inspections WHERE owner_id != ?1))",
                [owner_id],
            )
            .await?;

        let removed = self
            .conn
            .execute("DELETE FROM inspections WHERE owner_id != ?", [owner_id])
            .await?;

        if removed > 0 {
            tracing::info!(removed, owner_id, "Purged inspections from other accounts");
        }
        Ok(removed)
    }
}
