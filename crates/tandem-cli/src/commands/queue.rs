use std::path::Path;

use tandem_core::db::LibSqlOperationQueue;
use tandem_core::sync::OperationQueue;

use crate::commands::common::{
    format_queue_lines, open_database, operation_to_queue_item, QueueItem,
};
use crate::error::CliError;

pub async fn run_queue(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let queue = LibSqlOperationQueue::new(db.connection().clone());
    let operations = queue.enumerate_pending().await?;

    if as_json {
        let json_items = operations
            .iter()
            .map(operation_to_queue_item)
            .collect::<Vec<QueueItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&operations) {
        println!("{line}");
    }
    Ok(())
}
