//! libSQL-backed operation queue

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::str::FromStr;

use libsql::Connection;

use super::finish_transaction;
use super::repository::store_remote;
use crate::error::{Error, Result};
use crate::models::{ConflictEntry, OperationKind, PendingOperation, SyncConflict, TodoItem};
use crate::sync::{merge_queued, OperationQueue, QueueMerge};
use crate::util::unix_millis_now;

/// Queue a local mutation, collapsing it into any entry already queued for
/// the same item. Runs inside the caller's transaction.
pub(super) async fn enqueue(conn: &Connection, kind: OperationKind, item: &TodoItem) -> Result<()> {
    let id = item.id.as_str();
    let existing = queued_kind(conn, id).await?;
    let record = serde_json::to_string(item)?;

    match merge_queued(existing, kind)? {
        QueueMerge::Append(kind) => {
            conn.execute(
                "INSERT INTO pending_operations (item_id, kind, record, queued_at)
                 VALUES (?, ?, ?, ?)",
                libsql::params![id, kind.as_str(), record, unix_millis_now()],
            )
            .await?;
        }
        QueueMerge::Collapse(kind) => {
            conn.execute(
                "UPDATE pending_operations SET kind = ?, record = ? WHERE item_id = ?",
                libsql::params![kind.as_str(), record, id],
            )
            .await?;
        }
        QueueMerge::Cancel => {
            conn.execute("DELETE FROM pending_operations WHERE item_id = ?", [id])
                .await?;
        }
    }
    Ok(())
}

async fn queued_kind(conn: &Connection, id: &str) -> Result<Option<OperationKind>> {
    let mut rows = conn
        .query("SELECT kind FROM pending_operations WHERE item_id = ?", [id])
        .await?;

    match rows.next().await? {
        Some(row) => {
            let kind: String = row.get(0)?;
            Ok(Some(OperationKind::from_str(&kind)?))
        }
        None => Ok(None),
    }
}

async fn has_pending(conn: &Connection, id: &str) -> Result<bool> {
    Ok(queued_kind(conn, id).await?.is_some())
}

/// Operation queue over the `pending_operations` table.
///
/// Owns a handle to the shared connection, so it can live inside a sync
/// session next to repositories borrowing the same database.
#[derive(Clone)]
pub struct LibSqlOperationQueue {
    conn: Connection,
}

impl LibSqlOperationQueue {
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Number of queued operations
    pub async fn pending_count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM pending_operations", ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        usize::try_from(count).map_err(|_| Error::Database(format!("invalid count {count}")))
    }

    /// Most recent conflict resolutions, newest first
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, item_id, kind, status, resolution, resolved_at
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
                [limit as i64],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                record_id: row.get(1)?,
                kind: row.get(2)?,
                status: row.get(3)?,
                resolution: row.get(4)?,
                resolved_at: row.get(5)?,
            });
        }
        Ok(conflicts)
    }
}

impl OperationQueue for LibSqlOperationQueue {
    type Record = TodoItem;

    async fn initialize(&self) -> Result<()> {
        let pending = self.pending_count().await?;
        tracing::debug!("Operation queue ready with {pending} pending operation(s)");
        Ok(())
    }

    async fn enumerate_pending(&self) -> Result<Vec<PendingOperation<TodoItem>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT seq, kind, record FROM pending_operations ORDER BY seq",
                (),
            )
            .await?;

        let mut operations = Vec::new();
        while let Some(row) = rows.next().await? {
            let position: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let record: String = row.get(2)?;
            operations.push(PendingOperation::new(
                OperationKind::from_str(&kind)?,
                serde_json::from_str(&record)?,
                position,
            ));
        }
        Ok(operations)
    }

    async fn remove(&self, record_id: &str, adopt: Option<&TodoItem>) -> Result<()> {
        let conn = &self.conn;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome = async {
            conn.execute(
                "DELETE FROM pending_operations WHERE item_id = ?",
                [record_id],
            )
            .await?;
            if let Some(remote) = adopt {
                store_remote(conn, remote).await?;
            }
            Ok::<_, Error>(())
        }
        .await;
        finish_transaction(conn, outcome).await
    }

    async fn replace(&self, record_id: &str, operation: PendingOperation<TodoItem>) -> Result<()> {
        let conn = &self.conn;
        let record = serde_json::to_string(&operation.record)?;

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome = async {
            let rows = conn
                .execute(
                    "UPDATE pending_operations SET kind = ?, record = ? WHERE item_id = ?",
                    libsql::params![operation.kind.as_str(), record, record_id],
                )
                .await?;
            if rows == 0 {
                return Err(Error::NotFound(record_id.to_string()));
            }

            if operation.kind == OperationKind::Delete {
                conn.execute("DELETE FROM todo_items WHERE id = ?", [record_id])
                    .await?;
            } else {
                store_remote(conn, &operation.record).await?;
            }
            Ok::<_, Error>(())
        }
        .await;
        finish_transaction(conn, outcome).await
    }

    async fn merge_pulled(&self, records: Vec<TodoItem>) -> Result<usize> {
        let conn = &self.conn;
        conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome = async {
            let mut merged = 0;
            for record in &records {
                if has_pending(conn, record.id.as_str()).await? {
                    tracing::debug!("Keeping local change for {} over pulled copy", record.id);
                    continue;
                }
                store_remote(conn, record).await?;
                merged += 1;
            }
            Ok::<_, Error>(merged)
        }
        .await;
        finish_transaction(conn, outcome).await
    }

    async fn record_resolution(&self, entry: &ConflictEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts (item_id, kind, status, resolution, resolved_at)
                 VALUES (?, ?, ?, ?, ?)",
                libsql::params![
                    entry.record_id.as_str(),
                    entry.kind.as_str(),
                    entry.status.as_str(),
                    entry.resolution.as_str(),
                    unix_millis_now()
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlTodoRepository, TodoRepository};
    use crate::models::ItemId;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn item(id: &str, text: &str, version: Option<&str>) -> TodoItem {
        TodoItem {
            id: ItemId::from(id),
            text: text.to_string(),
            complete: false,
            version: version.map(str::to_string),
            deleted: false,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enumerate_in_queue_order() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());
        let queue = LibSqlOperationQueue::new(db.connection().clone());

        let first = repo.create("first").await.unwrap();
        let second = repo.create("second").await.unwrap();
        repo.update_text(&first.id, "first, edited").await.unwrap();

        let pending = queue.enumerate_pending().await.unwrap();
        let ids: Vec<_> = pending.iter().map(PendingOperation::record_id).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert!(pending[0].position < pending[1].position);
        assert_eq!(queue.pending_count().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_adopts_remote_copy() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());
        let queue = LibSqlOperationQueue::new(db.connection().clone());

        let created = repo.create("mine").await.unwrap();
        let remote = created.clone().with_version("v1");
        queue
            .remove(created.id.as_str(), Some(&remote))
            .await
            .unwrap();

        assert_eq!(queue.pending_count().await.unwrap(), 0);
        assert_eq!(repo.get(&created.id).await.unwrap(), Some(remote));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_switches_kind_in_place() {
        let db = setup().await;
        let conn = db.connection();
        let queue = LibSqlOperationQueue::new(conn.clone());
        let repo = LibSqlTodoRepository::new(conn);

        queue
            .merge_pulled(vec![item("B", "old", Some("v4"))])
            .await
            .unwrap();
        repo.delete(&ItemId::from("B")).await.unwrap();
        repo.create("after").await.unwrap();

        let slot = queue.enumerate_pending().await.unwrap()[0].clone();
        assert_eq!(slot.kind, OperationKind::Delete);

        let server = item("B", "baz", Some("v5"));
        queue
            .replace("B", slot.replaced_with(OperationKind::Update, server.clone()))
            .await
            .unwrap();

        let pending = queue.enumerate_pending().await.unwrap();
        assert_eq!(pending[0].position, slot.position);
        assert_eq!(pending[0].kind, OperationKind::Update);
        assert_eq!(pending[0].record, server);
        assert_eq!(repo.get(&ItemId::from("B")).await.unwrap(), Some(server));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_missing_entry_changes_nothing() {
        let db = setup().await;
        let queue = LibSqlOperationQueue::new(db.connection().clone());
        let repo = LibSqlTodoRepository::new(db.connection());

        let error = queue
            .replace(
                "ghost",
                PendingOperation::new(OperationKind::Update, item("ghost", "x", None), 1),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, Error::NotFound(_)));
        assert!(repo.get(&ItemId::from("ghost")).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_merge_pulled_respects_pending_changes() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());
        let queue = LibSqlOperationQueue::new(db.connection().clone());

        let mine = repo.create("mine").await.unwrap();
        queue
            .merge_pulled(vec![item("C", "doomed", Some("v1"))])
            .await
            .unwrap();

        let mut tombstone = item("C", "doomed", Some("v2"));
        tombstone.deleted = true;
        let mut theirs = mine.clone().with_version("v9");
        theirs.text = "theirs".to_string();

        let merged = queue
            .merge_pulled(vec![theirs, tombstone, item("D", "new", Some("v1"))])
            .await
            .unwrap();

        assert_eq!(merged, 2);
        assert_eq!(repo.get(&mine.id).await.unwrap().unwrap().text, "mine");
        assert!(repo.get(&ItemId::from("C")).await.unwrap().is_none());
        assert_eq!(
            repo.get(&ItemId::from("D")).await.unwrap(),
            Some(item("D", "new", Some("v1")))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_persisted_kind_is_fatal() {
        let db = setup().await;
        let queue = LibSqlOperationQueue::new(db.connection().clone());
        db.connection()
            .execute(
                "INSERT INTO pending_operations (item_id, kind, record, queued_at)
                 VALUES ('A', 'upsert', '{\"id\":\"A\",\"text\":\"x\"}', 0)",
                (),
            )
            .await
            .unwrap();

        let error = queue.enumerate_pending().await.unwrap_err();
        assert!(matches!(error, Error::UnhandledOperationKind(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_conflict_log_newest_first() {
        let db = setup().await;
        let queue = LibSqlOperationQueue::new(db.connection().clone());

        for (record_id, resolution) in [("A", "discard"), ("B", "change-kind")] {
            queue
                .record_resolution(&ConflictEntry {
                    record_id: record_id.to_string(),
                    kind: "update".to_string(),
                    status: "version-conflict".to_string(),
                    resolution: resolution.to_string(),
                })
                .await
                .unwrap();
        }

        let conflicts = queue.list_conflicts(10).await.unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].record_id, "B");
        assert_eq!(conflicts[0].resolution, "change-kind");
        assert_eq!(queue.list_conflicts(1).await.unwrap().len(), 1);
    }
}
