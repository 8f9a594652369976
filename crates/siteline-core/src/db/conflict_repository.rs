//! Resolved conflict repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use crate::error::Result;
use crate::models::ResolvedConflict;
use libsql::Connection;

/// Trait for conflict log operations (async)
#[allow(async_fn_in_trait)]
pub trait ConflictRepository {
    /// Record a resolver decision
    async fn record(
        &self,
        entity_kind: &str,
        entity_id: &str,
        local_updated_at: i64,
        server_updated_at: i64,
        winner: &str,
        strategy: &str,
    ) -> Result<()>;

    /// Most recently resolved conflicts
    async fn recent(&self, limit: usize) -> Result<Vec<ResolvedConflict>>;
}

/// libSQL implementation of `ConflictRepository`
pub struct LibSqlConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ConflictRepository for LibSqlConflictRepository<'_> {
    async fn record(
        &self,
        entity_kind: &str,
        entity_id: &str,
        local_updated_at: i64,
        server_updated_at: i64,
        winner: &str,
        strategy: &str,
    ) -> Result<()> {
        let resolved_at = chrono::Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT INTO sync_conflicts (entity_kind, entity_id, local_updated_at,
                     server_updated_at, winner, strategy, resolved_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    entity_kind,
                    entity_id,
                    local_updated_at,
                    server_updated_at,
                    winner,
                    strategy,
                    resolved_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ResolvedConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, entity_kind, entity_id, local_updated_at, server_updated_at,
                     winner, strategy, resolved_at
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
                [limit as i64],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(ResolvedConflict {
                id: row.get(0)?,
                entity_kind: row.get(1)?,
                entity_id: row.get(2)?,
                local_updated_at: row.get(3)?,
                server_updated_at: row.get(4)?,
                winner: row.get(5)?,
                strategy: row.get(6)?,
                resolved_at: row.get(7)?,
            });
        }
        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_and_list_recent() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlConflictRepository::new(db.connection());

        repo.record("entry", "ent_1", 100, 100, "merged", "field-merge")
            .await
            .unwrap();
        repo.record("inspection", "ins_1", 100, 200, "server", "last-write-wins")
            .await
            .unwrap();

        let conflicts = repo.recent(10).await.unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].entity_id, "ins_1");
        assert_eq!(conflicts[0].winner, "server");
        assert_eq!(conflicts[1].strategy, "field-merge");

        let limited = repo.recent(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
