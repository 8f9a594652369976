//! Inspection entry repository implementation

use crate::error::{Error, Result};
use crate::models::{EntryChanges, InspectionEntry, RecordId, SyncStatus};
use libsql::Connection;

const ENTRY_COLUMNS: &str = "id, inspection_id, section_ref, field_key, value, note,
     photos, maintenance_flag, marked_for_review, sync_status, created_at, updated_at";

/// Trait for entry storage operations (async)
#[allow(async_fn_in_trait)]
pub trait EntryRepository {
    /// Upsert an entry by its natural key (inspection, section, field).
    ///
    /// A second write to the same field replaces the first row; the id of
    /// the incoming entry wins, so a server pull can adopt the server id.
    async fn save(&self, entry: &InspectionEntry) -> Result<()>;

    /// Get an entry by id
    async fn get(&self, id: &RecordId) -> Result<Option<InspectionEntry>>;

    /// Get an entry by its natural key
    async fn get_by_key(
        &self,
        inspection_id: &RecordId,
        section_ref: &str,
        field_key: &str,
    ) -> Result<Option<InspectionEntry>>;

    /// List entries for an inspection in section/field order
    async fn list_for_inspection(&self, inspection_id: &RecordId) -> Result<Vec<InspectionEntry>>;

    /// Apply a partial change set and return the updated entry
    async fn update(&self, id: &RecordId, changes: EntryChanges) -> Result<InspectionEntry>;

    /// Swap an entry's id, used when the server assigns its identifier
    async fn rekey(&self, old_id: &RecordId, new_id: &RecordId) -> Result<()>;

    /// Update sync status only
    async fn set_sync_status(&self, id: &RecordId, sync_status: SyncStatus) -> Result<()>;

    /// Delete an entry row
    async fn delete(&self, id: &RecordId) -> Result<()>;
}

/// libSQL implementation of `EntryRepository`
pub struct LibSqlEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &libsql::Row) -> Result<InspectionEntry> {
        let sync_status: String = row.get(9)?;
        Ok(InspectionEntry {
            id: RecordId::from(row.get::<String>(0)?),
            inspection_id: RecordId::from(row.get::<String>(1)?),
            section_ref: row.get(2)?,
            field_key: row.get(3)?,
            value: serde_json::from_str(&row.get::<String>(4)?)?,
            note: row.get(5)?,
            photos: serde_json::from_str(&row.get::<String>(6)?)?,
            maintenance_flag: row.get::<i32>(7)? != 0,
            marked_for_review: row.get::<i32>(8)? != 0,
            sync_status: sync_status.parse()?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl EntryRepository for LibSqlEntryRepository<'_> {
    async fn save(&self, entry: &InspectionEntry) -> Result<()> {
        entry.validate()?;

        let value = serde_json::to_string(&entry.value)?;
        let photos = serde_json::to_string(&entry.photos)?;

        self.conn
            .execute(
                "INSERT INTO inspection_entries (id, inspection_id, section_ref, field_key,
                     value, note, photos, maintenance_flag, marked_for_review, sync_status,
                     created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(inspection_id, section_ref, field_key) DO UPDATE SET
                     id = excluded.id,
                     value = excluded.value,
                     note = excluded.note,
                     photos = excluded.photos,
                     maintenance_flag = excluded.maintenance_flag,
                     marked_for_review = excluded.marked_for_review,
                     sync_status = excluded.sync_status,
                     updated_at = excluded.updated_at",
                libsql::params![
                    entry.id.as_str(),
                    entry.inspection_id.as_str(),
                    entry.section_ref.as_str(),
                    entry.field_key.as_str(),
                    value,
                    entry.note.clone(),
                    photos,
                    i64::from(entry.maintenance_flag),
                    i64::from(entry.marked_for_review),
                    entry.sync_status.as_str(),
                    entry.created_at,
                    entry.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<InspectionEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {ENTRY_COLUMNS} FROM inspection_entries WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_key(
        &self,
        inspection_id: &RecordId,
        section_ref: &str,
        field_key: &str,
    ) -> Result<Option<InspectionEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM inspection_entries
                     WHERE inspection_id = ? AND section_ref = ? AND field_key = ?"
                ),
                [inspection_id.as_str(), section_ref, field_key],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_inspection(&self, inspection_id: &RecordId) -> Result<Vec<InspectionEntry>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM inspection_entries
                     WHERE inspection_id = ?
                     ORDER BY section_ref, field_key"
                ),
                [inspection_id.as_str()],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    async fn update(&self, id: &RecordId, changes: EntryChanges) -> Result<InspectionEntry> {
        let mut entry = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Entry {id}")))?;

        entry.apply_changes(changes);
        self.save(&entry).await?;
        Ok(entry)
    }

    async fn rekey(&self, old_id: &RecordId, new_id: &RecordId) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE inspection_entries SET id = ? WHERE id = ?",
                [new_id.as_str(), old_id.as_str()],
            )
            .await?;

        if affected == 0 {
            return Err(Error::NotFound(format!("Entry {old_id}")));
        }
        Ok(())
    }

    async fn set_sync_status(&self, id: &RecordId, sync_status: SyncStatus) -> Result<()> {
        self.conn
            .execute(
                "UPDATE inspection_entries SET sync_status = ? WHERE id = ?",
                [sync_status.as_str(), id.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        self.conn
            .execute("DELETE FROM inspection_entries WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }
}
