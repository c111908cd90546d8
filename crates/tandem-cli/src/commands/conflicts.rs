use std::path::Path;

use tandem_core::db::LibSqlOperationQueue;
use tandem_core::models::SyncConflict;

use crate::commands::common::{
    format_sync_conflict_lines, open_database, sync_conflict_to_item, SyncConflictItem,
};
use crate::error::CliError;

pub async fn list_sync_conflicts(
    limit: usize,
    db_path: &Path,
) -> Result<Vec<SyncConflict>, CliError> {
    let db = open_database(db_path).await?;
    let queue = LibSqlOperationQueue::new(db.connection().clone());
    Ok(queue.list_conflicts(limit).await?)
}

pub async fn run_conflicts(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let conflicts = list_sync_conflicts(limit, db_path).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
