//! Local libSQL storage: todo items, the pending operation queue and the
//! conflict audit log

mod connection;
mod migrations;
mod queue;
mod repository;

pub use connection::Database;
pub use queue::LibSqlOperationQueue;
pub use repository::{LibSqlTodoRepository, TodoRepository};

use crate::error::Result;
use libsql::Connection;

/// Commit when `outcome` is `Ok`, roll back otherwise
async fn finish_transaction<T>(conn: &Connection, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(value)
        }
        Err(e) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(e)
        }
    }
}
