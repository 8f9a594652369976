//! Database migrations
//!
//! The local database mirrors server state plus a queue of unsent work, so
//! schema evolution is deliberately blunt: when the stored version does not
//! match [`CURRENT_VERSION`], every table is dropped and recreated. The
//! device is not the system of record.

use crate::error::Result;
use libsql::Connection;

/// Current schema version
pub(crate) const CURRENT_VERSION: i32 = 1;

/// Bring the schema to the current version, rebuilding it on any mismatch.
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version == CURRENT_VERSION {
        return Ok(());
    }

    if version != 0 {
        tracing::warn!(
            found = version,
            expected = CURRENT_VERSION,
            "Schema version mismatch; rebuilding local mirror"
        );
        drop_schema(conn).await?;
    }

    create_schema(conn).await
}

/// Get the current schema version
pub(crate) async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

async fn drop_schema(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    // Children before parents so foreign keys never block the drop
    let statements = [
        "DROP TABLE IF EXISTS inspection_entries",
        "DROP TABLE IF EXISTS local_images",
        "DROP TABLE IF EXISTS sync_queue",
        "DROP TABLE IF EXISTS sync_conflicts",
        "DROP TABLE IF EXISTS sync_meta",
        "DROP TABLE IF EXISTS inspections",
        "DROP TABLE IF EXISTS schema_version",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

async fn create_schema(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // inside one transaction.

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Inspections mirrored from the server
        "CREATE TABLE IF NOT EXISTS inspections (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            target_ref TEXT NOT NULL,
            template TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            sync_status TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_inspections_owner ON inspections(owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_inspections_updated ON inspections(updated_at DESC)",
        // Captured entries, one row per (inspection, section, field)
        "CREATE TABLE IF NOT EXISTS inspection_entries (
            id TEXT PRIMARY KEY,
            inspection_id TEXT NOT NULL REFERENCES inspections(id) ON DELETE CASCADE,
            section_ref TEXT NOT NULL,
            field_key TEXT NOT NULL,
            value TEXT NOT NULL,
            note TEXT,
            photos TEXT NOT NULL,
            maintenance_flag INTEGER NOT NULL DEFAULT 0,
            marked_for_review INTEGER NOT NULL DEFAULT 0,
            sync_status TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (inspection_id, section_ref, field_key)
        )",
        "CREATE INDEX IF NOT EXISTS idx_entries_inspection ON inspection_entries(inspection_id)",
        "CREATE INDEX IF NOT EXISTS idx_entries_sync_status ON inspection_entries(sync_status)",
        // Captured photos tracked from local file to server URL
        "CREATE TABLE IF NOT EXISTS local_images (
            local_path TEXT PRIMARY KEY,
            server_url TEXT,
            status TEXT NOT NULL,
            inspection_id TEXT NOT NULL REFERENCES inspections(id) ON DELETE CASCADE,
            entry_id TEXT,
            created_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_images_inspection ON local_images(inspection_id)",
        "CREATE INDEX IF NOT EXISTS idx_images_status ON local_images(status)",
        // Outbound operation queue
        "CREATE TABLE IF NOT EXISTS sync_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            target_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            priority INTEGER NOT NULL,
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_queue_order ON sync_queue(priority, id)",
        "CREATE INDEX IF NOT EXISTS idx_queue_target ON sync_queue(target_id)",
        // Log of conflicts the resolver settled
        "CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_kind TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            local_updated_at INTEGER NOT NULL,
            server_updated_at INTEGER NOT NULL,
            winner TEXT NOT NULL,
            strategy TEXT NOT NULL,
            resolved_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC)",
        // Key/value sync bookkeeping (pull cursors and friends)
        "CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
