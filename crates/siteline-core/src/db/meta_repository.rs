//! Sync metadata repository implementation
//!
//! Key/value bookkeeping for the sync engine, most importantly the
//! per-inspection pull cursors (`cursor:{inspection_id}` keys).

use crate::error::Result;
use libsql::Connection;

/// Trait for sync metadata operations (async)
#[allow(async_fn_in_trait)]
pub trait MetaRepository {
    /// Read a metadata value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a metadata value
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// libSQL implementation of `MetaRepository`
pub struct LibSqlMetaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMetaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl MetaRepository for LibSqlMetaRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_meta WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
