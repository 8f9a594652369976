//! Sync queue repository implementation

use crate::error::Result;
use crate::models::{NewOperation, QueuedOperation, RecordId};
use libsql::Connection;

const QUEUE_COLUMNS: &str =
    "id, kind, target_id, payload, priority, retry_count, last_error, created_at";

/// Trait for sync queue storage operations (async)
#[allow(async_fn_in_trait)]
pub trait QueueRepository {
    /// Append an operation; returns the generated queue id
    async fn enqueue(&self, operation: &NewOperation) -> Result<i64>;

    /// All queued operations in drain order: priority band, then FIFO
    async fn pending(&self) -> Result<Vec<QueuedOperation>>;

    /// Remove an operation after it succeeded (or was dropped)
    async fn remove(&self, id: i64) -> Result<()>;

    /// Record a failed attempt; returns the updated retry count
    async fn record_failure(&self, id: i64, error: &str) -> Result<i64>;

    /// Re-point queued operations at a new target id; returns rows changed
    async fn retarget(&self, old_target: &RecordId, new_target: &RecordId) -> Result<u64>;

    /// Number of queued operations
    async fn depth(&self) -> Result<u64>;
}

/// libSQL implementation of `QueueRepository`
pub struct LibSqlQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_operation(row: &libsql::Row) -> Result<QueuedOperation> {
        let kind: String = row.get(1)?;
        Ok(QueuedOperation {
            id: row.get(0)?,
            kind: kind.parse()?,
            target_id: RecordId::from(row.get::<String>(2)?),
            payload: serde_json::from_str(&row.get::<String>(3)?)?,
            priority: row.get(4)?,
            retry_count: row.get(5)?,
            last_error: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl QueueRepository for LibSqlQueueRepository<'_> {
    async fn enqueue(&self, operation: &NewOperation) -> Result<i64> {
        let payload = serde_json::to_string(&operation.payload)?;
        let now = chrono::Utc::now().timestamp_millis();

        self.conn
            .execute(
                "INSERT INTO sync_queue (kind, target_id, payload, priority, retry_count,
                     last_error, created_at)
                 VALUES (?, ?, ?, ?, 0, NULL, ?)",
                libsql::params![
                    operation.kind.as_str(),
                    operation.target_id.as_str(),
                    payload,
                    operation.priority,
                    now,
                ],
            )
            .await?;

        Ok(self.conn.last_insert_rowid())
    }

    async fn pending(&self) -> Result<Vec<QueuedOperation>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {QUEUE_COLUMNS} FROM sync_queue
                     ORDER BY priority ASC, id ASC"
                ),
                (),
            )
            .await?;

        let mut operations = Vec::new();
        while let Some(row) = rows.next().await? {
            operations.push(Self::parse_operation(&row)?);
        }
        Ok(operations)
    }

    async fn remove(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    async fn record_failure(&self, id: i64, error: &str) -> Result<i64> {
        self.conn
            .execute(
                "UPDATE sync_queue SET retry_count = retry_count + 1, last_error = ?
                 WHERE id = ?",
                libsql::params![error, id],
            )
            .await?;

        let mut rows = self
            .conn
            .query("SELECT retry_count FROM sync_queue WHERE id = ?", [id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn retarget(&self, old_target: &RecordId, new_target: &RecordId) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "UPDATE sync_queue SET target_id = ? WHERE target_id = ?",
                [new_target.as_str(), old_target.as_str()],
            )
            .await?;
        Ok(affected)
    }

    async fn depth(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM sync_queue", ())
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.unsigned_abs()),
            None => Ok(0),
        }
    }
}
