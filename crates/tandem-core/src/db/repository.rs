//! Todo item repository
//!
//! Every write updates the local row and queues the matching push operation
//! in one transaction.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use libsql::{Connection, Row, Value};

use super::finish_transaction;
use super::queue::enqueue;
use crate::error::{Error, Result};
use crate::models::{ItemId, OperationKind, TodoItem};
use crate::util::unix_millis_now;

/// Trait for todo item storage operations (async)
#[allow(async_fn_in_trait)]
pub trait TodoRepository {
    /// Create a new item and queue its insert
    async fn create(&self, text: &str) -> Result<TodoItem>;

    /// Get an item by ID
    async fn get(&self, id: &ItemId) -> Result<Option<TodoItem>>;

    /// List items, most recently changed first
    async fn list(&self, limit: usize) -> Result<Vec<TodoItem>>;

    /// Most recently changed items not yet completed
    async fn list_pending(&self, limit: usize) -> Result<Vec<TodoItem>>;

    /// Replace an item's text and queue the update
    async fn update_text(&self, id: &ItemId, text: &str) -> Result<TodoItem>;

    /// Set the completion flag and queue the update
    async fn set_complete(&self, id: &ItemId, complete: bool) -> Result<TodoItem>;

    /// Remove an item locally and queue the delete
    async fn delete(&self, id: &ItemId) -> Result<()>;
}

/// libSQL implementation of `TodoRepository`
pub struct LibSqlTodoRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTodoRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn require(&self, id: &ItemId) -> Result<TodoItem> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn query_items(&self, sql: &str, limit: usize) -> Result<Vec<TodoItem>> {
        let mut rows = self.conn.query(sql, [limit as i64]).await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(item_from_row(&row)?);
        }
        Ok(items)
    }

    async fn write_update(&self, item: TodoItem) -> Result<TodoItem> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome = async {
            self.conn
                .execute(
                    "UPDATE todo_items SET text = ?, complete = ?, updated_at = ? WHERE id = ?",
                    libsql::params![
                        item.text.as_str(),
                        i64::from(item.complete),
                        unix_millis_now(),
                        item.id.as_str()
                    ],
                )
                .await?;
            enqueue(self.conn, OperationKind::Update, &item).await
        }
        .await;
        finish_transaction(self.conn, outcome).await?;
        Ok(item)
    }
}

fn validate_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("todo text cannot be empty".into()));
    }
    Ok(text)
}

/// Parse an item from an `id, text, complete, version` row
pub(super) fn item_from_row(row: &Row) -> Result<TodoItem> {
    let id: String = row.get(0)?;
    let version = match row.get_value(3)? {
        Value::Text(version) => Some(version),
        _ => None,
    };
    Ok(TodoItem {
        id: id.parse()?,
        text: row.get(1)?,
        complete: row.get::<i64>(2)? != 0,
        version,
        deleted: false,
    })
}

/// Insert or overwrite the local row for `item`
pub(super) async fn upsert_item(conn: &Connection, item: &TodoItem) -> Result<()> {
    let version = item.version.clone().map_or(Value::Null, Value::Text);
    conn.execute(
        "INSERT INTO todo_items (id, text, complete, version, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             text = excluded.text,
             complete = excluded.complete,
             version = excluded.version,
             updated_at = excluded.updated_at",
        libsql::params![
            item.id.as_str(),
            item.text.as_str(),
            i64::from(item.complete),
            version,
            unix_millis_now()
        ],
    )
    .await?;
    Ok(())
}

/// Store a remote copy locally; tombstones remove the row
pub(super) async fn store_remote(conn: &Connection, item: &TodoItem) -> Result<()> {
    if item.deleted {
        conn.execute("DELETE FROM todo_items WHERE id = ?", [item.id.as_str()])
            .await?;
        Ok(())
    } else {
        upsert_item(conn, item).await
    }
}

impl TodoRepository for LibSqlTodoRepository<'_> {
    async fn create(&self, text: &str) -> Result<TodoItem> {
        let item = TodoItem::new(validate_text(text)?);

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome = async {
            upsert_item(self.conn, &item).await?;
            enqueue(self.conn, OperationKind::Insert, &item).await
        }
        .await;
        finish_transaction(self.conn, outcome).await?;

        tracing::debug!("Created item {}", item.id);
        Ok(item)
    }

    async fn get(&self, id: &ItemId) -> Result<Option<TodoItem>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, text, complete, version FROM todo_items WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<TodoItem>> {
        self.query_items(
            "SELECT id, text, complete, version
             FROM todo_items
             ORDER BY updated_at DESC, id
             LIMIT ?",
            limit,
        )
        .await
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<TodoItem>> {
        self.query_items(
            "SELECT id, text, complete, version
             FROM todo_items
             WHERE complete = 0
             ORDER BY updated_at DESC, id
             LIMIT ?",
            limit,
        )
        .await
    }

    async fn update_text(&self, id: &ItemId, text: &str) -> Result<TodoItem> {
        let text = validate_text(text)?;
        let mut item = self.require(id).await?;
        item.text = text.to_string();
        self.write_update(item).await
    }

    async fn set_complete(&self, id: &ItemId, complete: bool) -> Result<TodoItem> {
        let mut item = self.require(id).await?;
        item.complete = complete;
        self.write_update(item).await
    }

    async fn delete(&self, id: &ItemId) -> Result<()> {
        let item = self.require(id).await?;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome = async {
            self.conn
                .execute("DELETE FROM todo_items WHERE id = ?", [id.as_str()])
                .await?;
            enqueue(self.conn, OperationKind::Delete, &item).await
        }
        .await;
        finish_transaction(self.conn, outcome).await
    }
}
