use std::path::Path;

use crate::commands::common::{format_item_lines, item_to_list_item, list_items, TodoListItem};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    pending_only: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let items = list_items(limit, pending_only, db_path).await?;

    if as_json {
        let json_items = items
            .iter()
            .map(item_to_list_item)
            .collect::<Vec<TodoListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if items.is_empty() {
        println!("Nothing to do.");
    } else {
        for line in format_item_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}
