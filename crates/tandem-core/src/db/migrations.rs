//! Schema migrations
//!
//! Each step runs in its own transaction and records its version in
//! `schema_version`, so an interrupted upgrade resumes at the failed step.

use crate::error::{Error, Result};
use libsql::Connection;

use super::finish_transaction;

struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "todo items and the pending operation queue",
        statements: &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS todo_items (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                complete INTEGER NOT NULL DEFAULT 0,
                version TEXT,
                updated_at INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_todo_items_updated ON todo_items(updated_at DESC)",
            // One entry per item; `seq` is the push order and survives in-place
            // replacement.
            "CREATE TABLE IF NOT EXISTS pending_operations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                record TEXT NOT NULL,
                queued_at INTEGER NOT NULL
            )",
        ],
    },
    Migration {
        version: 2,
        description: "conflict resolution audit log",
        statements: &[
            "CREATE TABLE IF NOT EXISTS sync_conflicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                resolution TEXT NOT NULL,
                resolved_at INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_item_id ON sync_conflicts(item_id)",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC)",
        ],
    },
];

/// Newest schema version this build knows about
const CURRENT_VERSION: i32 = 2;

/// Bring the schema up to `CURRENT_VERSION`
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;
    if version > CURRENT_VERSION {
        return Err(Error::Database(format!(
            "database schema v{version} is newer than this build (v{CURRENT_VERSION})"
        )));
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        apply(conn, migration).await?;
        tracing::info!(
            "Migrated database to v{} ({})",
            migration.version,
            migration.description
        );
    }
    Ok(())
}

/// Highest applied version; 0 for a fresh file
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    if rows.next().await?.is_none() {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;
    let outcome = async {
        for statement in migration.statements {
            conn.execute(statement, ()).await?;
        }
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            libsql::params![migration.version],
        )
        .await?;
        Ok::<_, Error>(())
    }
    .await;
    finish_transaction(conn, outcome).await
}
